use std::sync::{Arc, Mutex};
use toolwatch_core::{
    thread_safe, EventBus, EventFilter, SharedRegistry, Tool, ToolRegistry, ToolType,
    ToolwatchEvent,
};
use toolwatch_monitor::{MonitoringConfig, ProbeConfig, SimulatedMachine, ToolMonitor};

pub struct Rig {
    pub machine: Arc<SimulatedMachine>,
    pub registry: SharedRegistry,
    pub events: Arc<Mutex<Vec<ToolwatchEvent>>>,
    pub monitor: ToolMonitor,
}

impl Rig {
    pub fn event_count(&self, matches: impl Fn(&ToolwatchEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| matches(e)).count()
    }
}

pub fn endmill(id: u32) -> Tool {
    Tool::new(id, format!("T{}", id), ToolType::Endmill, 6.0, 50.0)
}

/// Fully equipped monitor with tool 1 selected
pub fn rig(config: MonitoringConfig, probe: Option<ProbeConfig>) -> Rig {
    let bus = Arc::new(EventBus::new());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    bus.subscribe(EventFilter::All, move |event| {
        sink.lock().unwrap().push(event.clone());
    });

    let registry = thread_safe(ToolRegistry::in_memory(bus.clone()));
    {
        let mut reg = registry.lock();
        reg.add(endmill(1).with_limits(100.0, 0.0)).unwrap();
        reg.select(1).unwrap();
    }

    let machine = Arc::new(SimulatedMachine::new());
    let mut builder = ToolMonitor::builder(config, bus)
        .registry(registry.clone())
        .position_source(machine.clone())
        .spindle(machine.clone())
        .pause_control(machine.clone())
        .emergency_stop(machine.clone());
    if let Some(probe) = probe {
        builder = builder.probe(probe, machine.clone(), machine.clone());
    }

    Rig {
        monitor: builder.build().unwrap(),
        machine,
        registry,
        events,
    }
}
