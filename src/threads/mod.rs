pub mod fix_fingers;
pub mod stabilize;
pub mod successor_list;
pub mod tcp_service;
