//! EtherDFS-Server: a Layer-2 file server exposing host directories as DOS
//! virtual drives (`C:`–`Z:`) to MS-DOS clients over raw Ethernet frames,
//! EtherType `0xEDF5`, with no IP stack involved.

pub mod answer_cache;
pub mod attrs;
pub mod config;
pub mod dispatch;
pub mod drives;
pub mod error;
pub mod frame;
pub mod fsdb;
pub mod fsops;
pub mod lockfile;
pub mod names;
pub mod net;
pub mod server;
pub mod signal;
pub mod time;
