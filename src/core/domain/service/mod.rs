pub mod preferred_ip;
