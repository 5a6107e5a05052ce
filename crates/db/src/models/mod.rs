pub mod device_state;
