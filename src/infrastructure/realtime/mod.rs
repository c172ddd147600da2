pub mod broadcast_realtime;

pub use broadcast_realtime::BroadcastRealtime;
