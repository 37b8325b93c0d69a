//! Agent control loop: the state machine that sequences telemetry
//! collection, baseline learning, anomaly evaluation, classification, and
//! transport, and owns the interruptible inter-tick sleep.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::anomaly::AnomalyEngine;
use crate::baseline::BaselineStore;
use crate::classifier::{Classifier, Verdict};
use crate::core::config::{AgentMode, Config};
use crate::core::errors::Result;
use crate::daemon::signals::SignalHandler;
use crate::logger::{EventKind, Logger};
use crate::telemetry::TelemetryFacade;
use crate::telemetry::output::{OutputWriter, Sink, StdoutSink};

/// The agent's position in the warmup/detect state machine. `Init` is
/// transient and never observed outside [`Agent::run`]'s first iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Learn,
    Warmup,
    Detect,
    Drain,
    Stopped,
}

impl State {
    const fn label(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Learn => "LEARN",
            Self::Warmup => "WARMUP",
            Self::Detect => "DETECT",
            Self::Drain => "DRAIN",
            Self::Stopped => "STOPPED",
        }
    }
}

/// Owns every stateful component and drives the tick loop. Generic over the
/// output sink so tests can substitute an in-memory sink for stdout.
pub struct Agent<S: Sink> {
    config: Config,
    state: State,
    facade: TelemetryFacade,
    baseline: BaselineStore,
    anomaly: AnomalyEngine,
    classifier: Classifier,
    output: OutputWriter<S>,
    logger: Logger,
    stop_flag: Arc<AtomicBool>,
}

impl Agent<StdoutSink> {
    /// Build an agent wired to the real stdout sink.
    pub fn init(config: Config, stop_flag: Arc<AtomicBool>) -> Result<Self> {
        Self::init_with_sink(config, stop_flag, StdoutSink)
    }
}

impl<S: Sink> Agent<S> {
    /// Build an agent with an explicit sink. All components are initialized
    /// once here, in dependency order, matching the lifecycle contract: the
    /// baseline is the only component with cross-run persistence.
    pub fn init_with_sink(config: Config, stop_flag: Arc<AtomicBool>, sink: S) -> Result<Self> {
        let facade = TelemetryFacade::init(config.telemetry_root_path.clone())?;
        let baseline = BaselineStore::init(config.baseline_db_path.clone())?;

        Ok(Self {
            state: State::Init,
            facade,
            baseline,
            anomaly: AnomalyEngine::new(),
            classifier: Classifier::new(),
            output: OutputWriter::new(sink),
            logger: Logger::stderr_only(),
            stop_flag,
            config,
        })
    }

    /// Run until the stop flag is set or a fatal error occurs. Returns `Ok`
    /// on a graceful stop, `Err` on a fatal pipeline failure (the caller
    /// maps this to a non-zero exit code).
    pub fn run(&mut self) -> Result<()> {
        self.transition(if self.config.mode == AgentMode::Baseline {
            State::Learn
        } else {
            State::Warmup
        });

        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                self.transition(State::Drain);
            }

            match self.state {
                State::Learn => {
                    if let Err(err) = self.tick_learn() {
                        self.logger.error(
                            EventKind::FatalError,
                            err.to_string(),
                            err.code(),
                        );
                        self.transition(State::Drain);
                    }
                }
                State::Warmup => match self.tick_warmup() {
                    Ok(()) => {
                        if self.baseline.ready() {
                            self.transition(State::Detect);
                        }
                    }
                    Err(err) => {
                        self.logger.error(EventKind::FatalError, err.to_string(), err.code());
                        self.transition(State::Drain);
                    }
                },
                State::Detect => match self.tick_detect() {
                    Ok(()) => {
                        if !self.baseline.ready() {
                            self.transition(State::Warmup);
                        }
                    }
                    Err(err) => {
                        self.logger.error(EventKind::FatalError, err.to_string(), err.code());
                        self.transition(State::Drain);
                    }
                },
                State::Drain => {
                    self.drain();
                    self.transition(State::Stopped);
                }
                State::Stopped => return Ok(()),
                State::Init => unreachable!("INIT is left before the loop body runs"),
            }

            if self.state == State::Stopped {
                return Ok(());
            }

            if !self.sleep_interruptible() {
                self.transition(State::Drain);
            }
        }
    }

    fn tick_learn(&mut self) -> Result<()> {
        let sample = self.facade.collect()?;
        self.baseline.update(&sample);
        self.emit_telemetry_logged(&sample, None, None);
        Ok(())
    }

    fn tick_warmup(&mut self) -> Result<()> {
        let sample = self.facade.collect()?;
        self.baseline.update(&sample);
        self.emit_telemetry_logged(&sample, None, None);
        Ok(())
    }

    fn emit_telemetry_logged(
        &mut self,
        sample: &crate::telemetry::Sample,
        detection: Option<&crate::anomaly::AnomalyResult>,
        classification: Option<&crate::classifier::ClassifierResult>,
    ) {
        if self
            .output
            .emit_telemetry(sample, detection, classification)
            .is_err()
        {
            self.logger
                .warn(EventKind::TransportFailure, "telemetry emit failed");
        }
    }

    fn tick_detect(&mut self) -> Result<()> {
        let sample = self.facade.collect()?;
        let anomaly = self.anomaly.evaluate(&sample);
        let classification = self.classifier.classify(&anomaly);

        self.emit_telemetry_logged(&sample, Some(&anomaly), Some(&classification));

        if classification.verdict == Verdict::Ransomware
            && self
                .output
                .emit_alert(&sample, &anomaly, &classification)
                .is_err()
        {
            self.logger
                .warn(EventKind::TransportFailure, "alert emit failed");
        }

        Ok(())
    }

    /// Sleep for the configured interval, waking early (and returning
    /// `false`) if the stop flag is set mid-sleep. Polls in short slices so
    /// a signal delivered during the sleep is observed within roughly one
    /// slice of latency rather than the full interval.
    fn sleep_interruptible(&self) -> bool {
        const SLICE: Duration = Duration::from_millis(50);
        let total = Duration::from_millis(self.config.sampling_interval_ms);
        let deadline = Instant::now() + total;

        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLICE.min(deadline - now));
        }
    }

    fn drain(&mut self) {
        if let Some(err) = self.baseline.shutdown() {
            self.logger.error(
                EventKind::ShutdownSaveFailure,
                err.to_string(),
                err.code(),
            );
        }
    }

    fn transition(&mut self, next: State) {
        if self.state == next {
            return;
        }
        self.logger.info(
            EventKind::StateTransition,
            format!("{} -> {}", self.state.label(), next.label()),
        );
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::output::format_telemetry;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default, Clone)]
    struct MemorySink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl Sink for MemorySink {
        fn emit_line(&mut self, line: &str) -> std::io::Result<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    fn config(dir: &std::path::Path, mode: AgentMode) -> Config {
        Config {
            sampling_interval_ms: 1,
            telemetry_root_path: dir.to_path_buf(),
            cloud_endpoint_url: "https://example.invalid".to_string(),
            baseline_db_path: dir.join("baseline.db"),
            mode,
        }
    }

    #[test]
    fn stop_flag_set_before_first_tick_drains_immediately() {
        let dir = tempdir().unwrap();
        let stop_flag = Arc::new(AtomicBool::new(true));
        let sink = MemorySink::default();
        let mut agent =
            Agent::init_with_sink(config(dir.path(), AgentMode::Baseline), stop_flag, sink)
                .unwrap();
        assert!(agent.run().is_ok());
        assert_eq!(agent.state, State::Stopped);
    }

    #[test]
    fn learn_mode_emits_telemetry_without_detection_fields() {
        let dir = tempdir().unwrap();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let sink = MemorySink::default();
        let lines = sink.lines.clone();
        let mut agent =
            Agent::init_with_sink(config(dir.path(), AgentMode::Baseline), stop_flag.clone(), sink)
                .unwrap();

        std::thread::spawn({
            let stop_flag = stop_flag.clone();
            move || {
                std::thread::sleep(Duration::from_millis(20));
                stop_flag.store(true, Ordering::Relaxed);
            }
        });

        agent.run().unwrap();
        let recorded = lines.lock().unwrap();
        assert!(!recorded.is_empty());
        assert!(!recorded[0].contains("anomaly_score"));
    }

    #[test]
    fn format_telemetry_is_used_consistently_with_the_writer() {
        let sample = crate::telemetry::sample::Sample {
            timestamp_ns: 0,
            cycles_per_sec: 0.0,
            instructions_per_sec: 0.0,
            cache_miss_rate: 0.0,
            aes_instructions_per_sec: -1.0,
            files_modified_per_sec: 0.0,
            files_renamed_per_sec: 0.0,
            files_deleted_per_sec: 0.0,
            top_pid: 0,
            top_comm: String::new(),
            disk_read_bytes_per_sec: 0.0,
            disk_write_bytes_per_sec: 0.0,
        };
        let line = format_telemetry(&sample, None, None);
        assert!(line.starts_with('{'));
    }
}
