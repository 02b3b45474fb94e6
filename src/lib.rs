pub mod config;
pub mod detect;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod model;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod refresh;
pub mod server;
pub mod source;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
