mod client;

pub use client::HttpVehicleRegistry;
