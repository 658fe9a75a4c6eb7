pub mod compact;
pub mod migrate;
pub mod recent;
pub mod serve;
pub mod version;
