pub mod command_reader;
pub mod payout_writer;
