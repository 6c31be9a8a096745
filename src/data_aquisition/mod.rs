/*
 * This module provides data aquisition abilites for the application.
 * It doesn't care what the switch says, just how to get it to say it:
 * probing which shell is listening, then running the transceiver command over SSH or Telnet.
 */

pub mod core;
pub mod host_key;
pub mod probe;
pub mod ssh;
pub mod telnet;

/// The one command whose output we parse.
pub const TRANSCEIVER_COMMAND: &str = "show interface transceiver";
/// Sent before the command on Telnet so the table is not paginated.
pub const DISABLE_PAGING_COMMAND: &str = "terminal length 0";
pub const EXIT_COMMAND: &str = "exit";
