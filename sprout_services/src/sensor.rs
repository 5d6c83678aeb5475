use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use sprout_models::{
    sensor::{SensorAlert, SensorReading, TemperatureRange},
    settings::SensorSettings,
};

const LIGHT_HISTORY: usize = 10;

pub trait SensorSource: Send + 'static {
    fn read(&mut self) -> SensorReading;
}

/// Random readings in plausible indoor ranges.
pub struct SimulatedSensor {
    rng: StdRng,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSource for SimulatedSensor {
    fn read(&mut self) -> SensorReading {
        SensorReading {
            light_lux: self.rng.random_range(0.0..=1000.0),
            temperature: self.rng.random_range(10.0..=40.0),
            humidity: self.rng.random_range(20.0..=100.0),
        }
    }
}

#[derive(Default)]
struct MonitorState {
    latest: Option<SensorReading>,
    recent_light: VecDeque<f64>,
    alert_active: bool,
}

impl MonitorState {
    /// Takes a reading unless an alert is waiting to be acknowledged.
    fn take_reading(
        &mut self,
        source: &mut dyn SensorSource,
        range: &TemperatureRange,
    ) -> Option<SensorAlert> {
        if self.alert_active {
            return None;
        }

        let reading = source.read();
        self.latest = Some(reading);
        if self.recent_light.len() == LIGHT_HISTORY {
            self.recent_light.pop_front();
        }
        self.recent_light.push_back(reading.light_lux);

        let alert = range.check(&reading);
        self.alert_active = alert.is_some();
        alert
    }
}

type SharedState = Arc<Mutex<MonitorState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MonitorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Periodic sensor polling. Runs until [`SensorMonitor::stop`] is called or the
/// monitor is dropped.
pub struct SensorMonitor {
    state: SharedState,
    cancellation_token: CancellationToken,
    task: JoinHandle<()>,
}

impl SensorMonitor {
    pub fn start(
        source: impl SensorSource,
        settings: SensorSettings,
        alerts: mpsc::Sender<SensorAlert>,
    ) -> Self {
        let state = SharedState::default();
        let cancellation_token = CancellationToken::new();
        let period = Duration::from_secs(settings.interval_secs.max(1));

        log::info!("[SENSOR] Monitor started, polling every {period:?}");
        let task = tokio::spawn(poll_sensor(
            Box::new(source),
            period,
            settings.temperature,
            Arc::clone(&state),
            alerts,
            cancellation_token.clone(),
        ));

        Self {
            state,
            cancellation_token,
            task,
        }
    }

    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Resumes readings after an alert.
    pub fn acknowledge_alert(&self) {
        lock(&self.state).alert_active = false;
    }

    pub fn is_alert_active(&self) -> bool {
        lock(&self.state).alert_active
    }

    pub fn latest(&self) -> Option<SensorReading> {
        lock(&self.state).latest
    }

    /// Light level of the most recent readings, oldest first.
    pub fn recent_light(&self) -> Vec<f64> {
        lock(&self.state).recent_light.iter().copied().collect()
    }
}

impl Drop for SensorMonitor {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

async fn poll_sensor(
    mut source: Box<dyn SensorSource>,
    period: Duration,
    range: TemperatureRange,
    state: SharedState,
    alerts: mpsc::Sender<SensorAlert>,
    cancellation_token: CancellationToken,
) {
    let mut ticks = time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                log::info!("[SENSOR] Monitor stopped");
                break;
            }
            _ = ticks.tick() => {
                let alert = lock(&state).take_reading(source.as_mut(), &range);

                if let Some(alert) = alert {
                    log::warn!("[SENSOR] {alert}");
                    if alerts.send(alert).await.is_err() {
                        log::info!("[SENSOR] Nobody listens for alerts, stopping");
                        break;
                    }
                }
            }
        }
    }
}
