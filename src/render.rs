use crate::msg::{PathRecord, PathState};
use crate::units;

/// Print one record: a multi-line block on a terminal, one
/// whitespace-delimited line otherwise (same fields, same order).
pub fn print_record(rec: &PathRecord, term: bool) {
    // Unset slots have nothing to report.
    if rec.state == PathState::Empty {
        return;
    }
    if term {
        print!("{}", verbose(rec));
    } else {
        println!("{}", plain(rec));
    }
}

fn remote_addr(rec: &PathRecord) -> (String, u16) {
    match rec.remote {
        Some(addr) => (addr.ip().to_string(), addr.port()),
        None => ("-".to_string(), 0),
    }
}

fn verbose(rec: &PathRecord) -> String {
    let (addr, port) = remote_addr(rec);
    format!(
        "path {}\n\
         \x20 status:  {}\n\
         \x20 interface: {}\n\
         \x20 remote:  {} port {}\n\
         \x20 mtu:     {} bytes\n\
         \x20 rtt:     {:.3} ms\n\
         \x20 rttvar:  {:.3} ms\n\
         \x20 rate:    {}\n\
         \x20 preferred: {}\n\
         \x20 losslim: {}%\n\
         \x20 rttlim:  {} ms\n\
         \x20 beat:    {} ms\n\
         \x20 tx:\n\
         \x20   rate:  {} bytes/sec\n\
         \x20   loss:  {} percent\n\
         \x20   total: {} packets\n\
         \x20 rx:\n\
         \x20   rate:  {} bytes/sec\n\
         \x20   loss:  {} percent\n\
         \x20   total: {} packets\n",
        rec.state,
        if rec.ok { "OK" } else { "DEGRADED" },
        rec.ifname,
        addr,
        port,
        rec.mtu,
        units::wire_to_ms_f(rec.rtt),
        units::wire_to_ms_f(rec.rttvar),
        if rec.conf.fixed_rate { "fixed" } else { "auto" },
        if rec.conf.preferred { "yes" } else { "no" },
        units::loss_wire_to_percent(rec.conf.loss_limit),
        units::wire_to_ms(rec.conf.rtt_limit),
        units::wire_to_ms(rec.conf.beat),
        rec.tx.rate,
        rec.tx.loss,
        rec.tx.total,
        rec.rx.rate,
        rec.rx.loss,
        rec.rx.total,
    )
}

fn plain(rec: &PathRecord) -> String {
    let (addr, port) = remote_addr(rec);
    format!(
        "path {} {} {} -> {} {} {} {:.3} {:.3} {} {} {} {} {} {} {} {} {} {} {}",
        rec.state,
        if rec.ok { "OK" } else { "DEGRADED" },
        rec.ifname,
        addr,
        port,
        rec.mtu,
        units::wire_to_ms_f(rec.rtt),
        units::wire_to_ms_f(rec.rttvar),
        if rec.conf.fixed_rate { "fixed" } else { "auto" },
        if rec.conf.preferred { "PREFERRED" } else { "NOT-PREFERRED" },
        units::loss_wire_to_percent(rec.conf.loss_limit),
        units::wire_to_ms(rec.conf.rtt_limit),
        units::wire_to_ms(rec.conf.beat),
        rec.tx.rate,
        rec.tx.loss,
        rec.tx.total,
        rec.rx.rate,
        rec.rx.loss,
        rec.rx.total,
    )
}
