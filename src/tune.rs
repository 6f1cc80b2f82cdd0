use crate::cli::PathOptions;
use crate::ctl::{Channel, CtlError};
use crate::msg::{ControlRequest, MsgType, PathPatch, Reply, WireError};
use crate::units;

/// Translate validated options into the sparse wire patch. Fields the
/// caller never set stay `None` and keep their daemon-side values.
pub fn build_patch(opts: &PathOptions) -> PathPatch {
    PathPatch {
        ifname: opts.ifname.clone(),
        state: opts.state,
        rate_tx: opts.rate_tx,
        rate_rx: opts.rate_rx,
        rate_mode: opts.rate_mode,
        beat: opts.beat,
        preferred: opts.preferred.then_some(true),
        loss_limit: opts.loss_limit.map(units::loss_percent_to_wire),
        rtt_limit: opts.rtt_limit.map(units::ms_to_wire),
    }
}

/// Apply one patch: exactly one send and one receive, no streaming.
pub fn run(chan: &mut dyn Channel, patch: &PathPatch) -> Result<(), CtlError> {
    chan.send(&ControlRequest::state(patch.clone()))?;
    match chan.recv(MsgType::State)? {
        Reply::Done => Ok(()),
        Reply::Failed(code) => Err(CtlError::Server(code)),
        Reply::Continue(_) => Err(CtlError::Protocol(WireError::UnexpectedRecord)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctl::testing::ScriptedChannel;
    use crate::msg::PathState;

    fn down_eth0() -> PathPatch {
        build_patch(&PathOptions {
            ifname: Some("eth0".into()),
            state: Some(PathState::Down),
            ..PathOptions::default()
        })
    }

    #[test]
    fn accepted_patch_is_one_state_round_trip() {
        let mut chan = ScriptedChannel::replying(vec![Ok(Reply::Done)]);
        run(&mut chan, &down_eth0()).unwrap();
        assert_eq!(chan.sent.len(), 1);
        assert_eq!(chan.sent[0].kind, MsgType::State);
        assert!(chan.replies.is_empty(), "exactly one receive");
    }

    #[test]
    fn daemon_refusal_carries_its_code() {
        let mut chan = ScriptedChannel::replying(vec![Ok(Reply::Failed(19))]);
        assert!(matches!(run(&mut chan, &down_eth0()), Err(CtlError::Server(19))));
    }

    #[test]
    fn units_are_translated_into_the_patch() {
        let patch = build_patch(&PathOptions {
            ifname: Some("eth0".into()),
            loss_limit: Some(50),
            rtt_limit: Some(200),
            preferred: true,
            ..PathOptions::default()
        });
        assert_eq!(patch.loss_limit, Some(127));
        assert_eq!(patch.rtt_limit, Some(200_000));
        assert_eq!(patch.preferred, Some(true));
        assert_eq!(patch.state, None);
        assert_eq!(patch.rate_mode, None);
    }
}
