/*
This module turns raw device output into typed records.

--- data_aquisition module ---
SSH/Telnet
|
| RawResponse: the lines the switch printed, unparsed
v
--- parsers module ---
InterfaceTelemetry records, one per transceiver row
*/

pub mod transceiver;

pub use transceiver::{InterfaceTelemetry, LineOutcome, Measurement, SkipReason, TransceiverParser};
