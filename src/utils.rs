//! Small helpers shared by the protocol layers.

use hexplay::HexViewBuilder;
use log::{log_enabled, trace, Level::Trace};

/// Dump bytes going over the wire in a hex table when trace logging is on.
pub(crate) fn trace_bytes(direction: &str, data: &[u8]) {
    if log_enabled!(Trace) {
        let view = HexViewBuilder::new(data)
            .address_offset(0)
            .row_width(16)
            .finish();
        trace!("{} {} byte(s)\n{}", direction, data.len(), view);
    }
}
