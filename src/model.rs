// Model of the data shown and logged by this app

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};

use crate::config::BoardVariant;
use crate::fan::{FanPair, FanRole};

#[derive(Debug, Clone, Copy)]
pub struct Model {
    pub node_name: &'static str,
    pub variant: BoardVariant,
    pub temperature: Option<f32>,
    pub fans: FanPair,
    pub rpm: [u32; 2],
}

impl Model {
    pub fn rpm(&self, role: FanRole) -> u32 {
        self.rpm[role as usize]
    }
}

/// Latest snapshot, published by the sampling loop and drawn by the display task.
pub static STATUS: Signal<CriticalSectionRawMutex, Model> = Signal::new();
