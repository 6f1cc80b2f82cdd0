use std::io::IsTerminal;

use crate::ctl::{Channel, CtlError};
use crate::msg::{ControlRequest, MsgType, PathRecord, PathState, Reply};
use crate::render;

/// Client-side selection applied after the drain; `Empty` state and an
/// absent name both mean "keep everything".
#[derive(Debug, Clone, Default)]
pub struct StatusFilter {
    pub state: PathState,
    pub ifname: Option<String>,
}

/// Drain the daemon's record stream: one PATH_STATUS request, then one
/// envelope per record until a terminal reply. All-or-nothing: a failure
/// mid-stream discards everything received so far.
pub fn fetch(chan: &mut dyn Channel, filter: &StatusFilter) -> Result<Vec<PathRecord>, CtlError> {
    let req = ControlRequest::status(filter.ifname.clone(), filter.state);
    chan.send(&req)?;

    let mut records = Vec::new();
    loop {
        match chan.recv(MsgType::PathStatus)? {
            Reply::Continue(rec) => records.push(rec),
            Reply::Done => break,
            Reply::Failed(code) => return Err(CtlError::Server(code)),
        }
    }
    apply_filter(&mut records, filter);
    Ok(records)
}

fn apply_filter(records: &mut Vec<PathRecord>, filter: &StatusFilter) {
    if filter.state != PathState::Empty {
        records.retain(|r| r.state == filter.state);
    }
    if let Some(name) = filter.ifname.as_deref() {
        records.retain(|r| r.ifname == name);
    }
}

pub fn run(chan: &mut dyn Channel, filter: &StatusFilter) -> Result<(), CtlError> {
    let records = fetch(chan, filter)?;
    let term = std::io::stdout().is_terminal();
    for rec in &records {
        render::print_record(rec, term);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctl::testing::ScriptedChannel;
    use crate::msg::{self, WireError, MSG_SIZE};
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    fn rec(name: &str, state: PathState) -> PathRecord {
        msg::sample_record(name, state)
    }

    #[test]
    fn drains_records_in_arrival_order() {
        let mut chan = ScriptedChannel::replying(vec![
            Ok(Reply::Continue(rec("eth0", PathState::Up))),
            Ok(Reply::Continue(rec("eth1", PathState::Backup))),
            Ok(Reply::Continue(rec("wwan0", PathState::Down))),
            Ok(Reply::Done),
        ]);
        let got = fetch(&mut chan, &StatusFilter::default()).unwrap();
        let names: Vec<_> = got.iter().map(|r| r.ifname.as_str()).collect();
        assert_eq!(names, ["eth0", "eth1", "wwan0"]);
        assert_eq!(chan.sent.len(), 1);
        assert_eq!(chan.sent[0].kind, MsgType::PathStatus);
    }

    #[test]
    fn empty_stream_yields_no_records() {
        let mut chan = ScriptedChannel::replying(vec![Ok(Reply::Done)]);
        assert!(fetch(&mut chan, &StatusFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn mid_stream_type_mismatch_discards_everything() {
        let mut chan = ScriptedChannel::replying(vec![
            Ok(Reply::Continue(rec("eth0", PathState::Up))),
            Ok(Reply::Continue(rec("eth1", PathState::Up))),
            Err(CtlError::Protocol(WireError::TypeMismatch {
                sent: MsgType::PathStatus,
                got: MsgType::State,
            })),
        ]);
        assert!(matches!(
            fetch(&mut chan, &StatusFilter::default()),
            Err(CtlError::Protocol(_))
        ));
    }

    #[test]
    fn server_error_discards_buffered_records() {
        let mut chan = ScriptedChannel::replying(vec![
            Ok(Reply::Continue(rec("eth0", PathState::Up))),
            Ok(Reply::Failed(13)),
        ]);
        assert!(matches!(
            fetch(&mut chan, &StatusFilter::default()),
            Err(CtlError::Server(13))
        ));
    }

    #[test]
    fn state_and_name_filters_apply_client_side() {
        let replies = || {
            vec![
                Ok(Reply::Continue(rec("eth0", PathState::Up))),
                Ok(Reply::Continue(rec("eth1", PathState::Down))),
                Ok(Reply::Continue(rec("eth2", PathState::Up))),
                Ok(Reply::Done),
            ]
        };

        let mut chan = ScriptedChannel::replying(replies());
        let filter = StatusFilter { state: PathState::Up, ifname: None };
        let names: Vec<_> = fetch(&mut chan, &filter)
            .unwrap()
            .into_iter()
            .map(|r| r.ifname)
            .collect();
        assert_eq!(names, ["eth0", "eth2"]);

        let mut chan = ScriptedChannel::replying(replies());
        let filter = StatusFilter { state: PathState::Up, ifname: Some("eth2".into()) };
        let names: Vec<_> = fetch(&mut chan, &filter)
            .unwrap()
            .into_iter()
            .map(|r| r.ifname)
            .collect();
        assert_eq!(names, ["eth2"]);
    }

    /// Simulated daemon on the far end of a socketpair: consume the
    /// request, stream the given replies back, hang up.
    fn spawn_daemon(
        mut sock: UnixStream,
        replies: Vec<Reply>,
    ) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            let mut req = [0u8; MSG_SIZE];
            sock.read_exact(&mut req).unwrap();
            assert_eq!(req[0], MsgType::PathStatus as u8);
            for reply in &replies {
                sock.write_all(&msg::encode_reply(MsgType::PathStatus, reply))
                    .unwrap();
            }
        })
    }

    #[test]
    fn end_to_end_over_a_socketpair() {
        let (mut client, server) = UnixStream::pair().unwrap();
        let daemon = spawn_daemon(
            server,
            vec![
                Reply::Continue(rec("eth0", PathState::Up)),
                Reply::Continue(rec("eth1", PathState::Down)),
                Reply::Done,
            ],
        );

        let all = fetch(&mut client, &StatusFilter::default()).unwrap();
        let names: Vec<_> = all.iter().map(|r| r.ifname.as_str()).collect();
        assert_eq!(names, ["eth0", "eth1"]);
        daemon.join().unwrap();

        let (mut client, server) = UnixStream::pair().unwrap();
        let daemon = spawn_daemon(
            server,
            vec![
                Reply::Continue(rec("eth0", PathState::Up)),
                Reply::Continue(rec("eth1", PathState::Down)),
                Reply::Done,
            ],
        );
        let filter = StatusFilter { state: PathState::Up, ifname: None };
        let up = fetch(&mut client, &filter).unwrap();
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].ifname, "eth0");
        daemon.join().unwrap();
    }
}
