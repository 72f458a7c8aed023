//! The training / benchmark / display loop.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::benchmark::BenchmarkBuffer;
use super::ledger::RewardLedger;
use super::outputs;
use super::roster::{Roster, ShuffleMode};
use crate::checkpoint::{CheckpointManager, CheckpointMetrics};
use crate::env::{Action, MultiAgentEnv, Observation};
use crate::error::RunError;
use crate::render::{render_frame, Camera, VideoSink};
use crate::trainer::{AgentTrainer, Experience};
use crate::ui::Viewer;

/// Knobs the loop reads on every step.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub max_episode_len: usize,
    pub num_episodes: usize,
    /// Checkpoint every this many completed episodes; 0 never checkpoints.
    pub save_rate: usize,
    pub shuffle: Option<ShuffleMode>,
    pub shared: bool,
    pub benchmark: bool,
    pub benchmark_iters: u64,
    pub save_replay: bool,
    pub render_delay: Duration,
    pub num_adversaries: usize,
    pub exp_name: String,
    pub benchmark_dir: PathBuf,
    pub plots_dir: PathBuf,
}

impl Default for LoopSettings {
    fn default() -> Self {
        LoopSettings {
            max_episode_len: 25,
            num_episodes: 60_000,
            save_rate: 1000,
            shuffle: None,
            shared: false,
            benchmark: false,
            benchmark_iters: 100_000,
            save_replay: false,
            render_delay: Duration::from_millis(10),
            num_adversaries: 0,
            exp_name: String::new(),
            benchmark_dir: PathBuf::from("./benchmark_files/"),
            plots_dir: PathBuf::from("./learning_curves/"),
        }
    }
}

/// Where the loop is after the most recent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    RunningEpisode,
    EpisodeBoundary,
    BenchmarkTerminating,
    TrainingTerminating,
    RecordingTerminating,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    TrainingFinished {
        episodes: usize,
        rewards_file: PathBuf,
        agrewards_file: PathBuf,
    },
    BenchmarkFinished {
        path: PathBuf,
    },
    RecordingFinished {
        frames: usize,
    },
}

struct Recorder {
    sink: Box<dyn VideoSink>,
    camera: Camera,
}

/// Drives one environment and one trainer per agent until the run ends.
pub struct ControlLoop<E: MultiAgentEnv, T: AgentTrainer> {
    env: E,
    trainers: Vec<T>,
    settings: LoopSettings,
    roster: Roster,
    ledger: RewardLedger,
    benchmark: BenchmarkBuffer<E::Info>,
    obs: Vec<Observation>,
    episode_step: usize,
    train_step: u64,
    state: LoopState,
    timer: Instant,
    rng: StdRng,
    checkpoints: CheckpointManager,
    viewer: Option<Box<dyn Viewer>>,
    recorder: Option<Recorder>,
}

impl<E: MultiAgentEnv, T: AgentTrainer> ControlLoop<E, T> {
    /// Reset `env` and pair `trainers[k]` with agent slot `k`.
    pub fn new(
        mut env: E,
        trainers: Vec<T>,
        settings: LoopSettings,
        checkpoints: CheckpointManager,
    ) -> Self {
        let n = env.n();
        let obs = env.reset();
        ControlLoop {
            env,
            roster: Roster::new(trainers.len()),
            trainers,
            settings,
            ledger: RewardLedger::new(n),
            benchmark: BenchmarkBuffer::new(n),
            obs,
            episode_step: 0,
            train_step: 0,
            state: LoopState::RunningEpisode,
            timer: Instant::now(),
            rng: StdRng::from_os_rng(),
            checkpoints,
            viewer: None,
            recorder: None,
        }
    }

    /// Seed the roster shuffles.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_viewer(mut self, viewer: Box<dyn Viewer>) -> Self {
        self.viewer = Some(viewer);
        self
    }

    /// Append a frame per step to `sink`; the run ends at the first
    /// episode boundary.
    pub fn with_recorder(mut self, sink: Box<dyn VideoSink>, camera: Camera) -> Self {
        self.recorder = Some(Recorder { sink, camera });
        self
    }

    pub fn trainers(&self) -> &[T] {
        &self.trainers
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    pub fn benchmark(&self) -> &BenchmarkBuffer<E::Info> {
        &self.benchmark
    }

    pub fn episode_step(&self) -> usize {
        self.episode_step
    }

    pub fn train_step(&self) -> u64 {
        self.train_step
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Step until the run ends.
    pub fn run(&mut self) -> Result<RunOutcome, RunError> {
        println!("Starting iterations...");
        info!(
            agents = self.trainers.len(),
            benchmark = self.settings.benchmark,
            recording = self.recorder.is_some(),
            "control loop started"
        );
        loop {
            if let Some(outcome) = self.step()? {
                return Ok(outcome);
            }
        }
    }

    /// One timestep across all agents. Returns the outcome once the run is over.
    pub fn step(&mut self) -> Result<Option<RunOutcome>, RunError> {
        self.state = LoopState::RunningEpisode;
        let benchmark = self.settings.benchmark;

        if !benchmark && self.settings.shuffle == Some(ShuffleMode::Timestep) {
            self.roster.shuffle(&mut self.rng);
        }

        let actions: Vec<Action> = self
            .roster
            .order()
            .iter()
            .enumerate()
            .map(|(slot, &i)| self.trainers[i].action(&self.obs[slot]))
            .collect();

        let transition = self.env.step(&actions)?;
        self.episode_step += 1;
        let done = transition.dones.iter().all(|&d| d);
        let terminal = self.episode_step >= self.settings.max_episode_len;

        for (slot, &i) in self.roster.order().iter().enumerate() {
            self.trainers[i].experience(
                &self.obs[slot],
                &actions[slot],
                transition.rewards[slot],
                &transition.observations[slot],
                transition.dones[slot],
                terminal,
            );
        }
        self.obs = transition.observations;
        self.ledger.add_step(&transition.rewards);
        self.benchmark.push_step(transition.infos);

        self.render()?;

        let boundary = done || terminal;
        if boundary {
            self.state = LoopState::EpisodeBoundary;
            if let Some(mut recorder) = self.recorder.take() {
                let frames = recorder.sink.close()?;
                self.state = LoopState::RecordingTerminating;
                info!(frames, "recording finished");
                return Ok(Some(RunOutcome::RecordingFinished { frames }));
            }
            self.obs = self.env.reset();
            self.episode_step = 0;
            self.ledger.close_episode();
            self.benchmark.open_episode();
            if !benchmark && self.settings.shuffle == Some(ShuffleMode::Episode) {
                self.roster.shuffle(&mut self.rng);
            }
            debug!(
                episode = self.ledger.completed(),
                done,
                terminal,
                "episode finished"
            );
        }

        self.train_step += 1;

        if benchmark {
            if boundary && self.train_step >= self.settings.benchmark_iters {
                return self.finish_benchmark().map(Some);
            }
            return Ok(None);
        }

        self.roster.preupdate_all(&mut self.trainers);
        self.roster
            .update_all(&mut self.trainers, self.train_step, self.settings.shared)?;

        let completed = self.ledger.completed();
        let save_rate = self.settings.save_rate;
        if terminal && completed > 0 && completed.checked_rem(save_rate) == Some(0) {
            self.checkpoint(completed)?;
        }

        if completed > self.settings.num_episodes {
            return self.finish_training(completed).map(Some);
        }
        Ok(None)
    }

    fn render(&mut self) -> Result<(), RunError> {
        if self.viewer.is_none() && self.recorder.is_none() {
            return Ok(());
        }
        if !self.settings.render_delay.is_zero() {
            thread::sleep(self.settings.render_delay);
        }
        let scene = self.env.render();
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.show(&scene).map_err(RunError::Viewer)?;
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder
                .sink
                .write_frame(&render_frame(&scene, &recorder.camera))?;
        }
        Ok(())
    }

    fn checkpoint(&mut self, completed: usize) -> Result<(), RunError> {
        let summary = self.ledger.record_checkpoint(self.settings.save_rate);
        self.checkpoints.save(
            &self.trainers,
            self.train_step,
            completed,
            CheckpointMetrics {
                mean_episode_reward: summary.mean_episode_reward,
                agent_episode_rewards: summary.agent_episode_rewards.clone(),
            },
        )?;

        let elapsed = (self.timer.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
        if self.settings.num_adversaries == 0 {
            println!(
                "steps: {}, episodes: {}, mean episode reward: {}, time: {}",
                self.train_step, completed, summary.mean_episode_reward, elapsed
            );
        } else {
            println!(
                "steps: {}, episodes: {}, mean episode reward: {}, agent episode reward: {:?}, time: {}",
                self.train_step,
                completed,
                summary.mean_episode_reward,
                summary.agent_episode_rewards,
                elapsed
            );
        }
        self.timer = Instant::now();
        Ok(())
    }

    fn finish_benchmark(&mut self) -> Result<RunOutcome, RunError> {
        println!("Finished benchmarking, now saving...");
        let path = outputs::benchmark_path(&self.settings.benchmark_dir, &self.settings.exp_name);
        // Replays go out in original trainer order, not roster order.
        let replays: Option<Vec<&[Experience]>> = self
            .settings
            .save_replay
            .then(|| self.trainers.iter().map(|t| t.replay_storage()).collect());
        let episodes = self.benchmark.closed().len();
        outputs::write_benchmark(&path, self.benchmark.closed(), replays.as_deref())?;
        self.benchmark.clear();
        self.state = LoopState::BenchmarkTerminating;
        info!(path = %path.display(), episodes, "benchmark written");
        Ok(RunOutcome::BenchmarkFinished { path })
    }

    fn finish_training(&mut self, completed: usize) -> Result<RunOutcome, RunError> {
        let (rewards_file, agrewards_file) =
            outputs::curve_paths(&self.settings.plots_dir, &self.settings.exp_name);
        outputs::write_curve(&rewards_file, self.ledger.final_rewards())?;
        outputs::write_curve(&agrewards_file, self.ledger.final_agent_rewards())?;
        println!("...Finished total of {completed} episodes.");
        self.state = LoopState::TrainingTerminating;
        Ok(RunOutcome::TrainingFinished {
            episodes: completed,
            rewards_file,
            agrewards_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::error::Error;
    use std::io;
    use std::path::Path;
    use std::rc::Rc;

    use serde_pickle::DeOptions;

    use super::*;
    use crate::checkpoint::{CheckpointManagerConfig, RunDescriptor};
    use crate::env::{Scene, Space, Transition};
    use crate::error::{EnvError, RecordingError};
    use crate::render::RgbFrame;
    use crate::trainer::{PeerSample, SampleRequest, TrainerParams, UpdateStats};

    /// Each agent observes its own slot index; every agent earns 1.0 per
    /// step; all agents report done every `done_every` steps.
    struct ScriptedEnv {
        n: usize,
        t: usize,
        done_every: Option<usize>,
        resets: usize,
    }

    impl ScriptedEnv {
        fn new(n: usize) -> Self {
            ScriptedEnv {
                n,
                t: 0,
                done_every: None,
                resets: 0,
            }
        }

        fn observations(&self) -> Vec<Observation> {
            (0..self.n).map(|slot| vec![slot as f32]).collect()
        }
    }

    impl MultiAgentEnv for ScriptedEnv {
        type Info = u32;

        fn n(&self) -> usize {
            self.n
        }

        fn observation_space(&self, _agent: usize) -> Space {
            Space::Box(1)
        }

        fn action_space(&self, _agent: usize) -> Space {
            Space::Discrete(2)
        }

        fn reset(&mut self) -> Vec<Observation> {
            self.t = 0;
            self.resets += 1;
            self.observations()
        }

        fn step(&mut self, actions: &[Action]) -> Result<Transition<u32>, EnvError> {
            if actions.len() != self.n {
                return Err(EnvError::ActionCount {
                    expected: self.n,
                    got: actions.len(),
                });
            }
            self.t += 1;
            let done = self.done_every.is_some_and(|k| self.t % k == 0);
            Ok(Transition {
                observations: self.observations(),
                rewards: vec![1.0; self.n],
                dones: vec![done; self.n],
                infos: vec![self.t as u32; self.n],
            })
        }

        fn render(&self) -> Scene {
            Scene::default()
        }
    }

    #[derive(Default)]
    struct Calls {
        actions: usize,
        experiences: usize,
        preupdates: usize,
        updates: usize,
        terminals: usize,
        observed: Vec<f32>,
    }

    struct MockTrainer {
        name: String,
        calls: Calls,
        storage: Vec<Experience>,
    }

    impl MockTrainer {
        fn roster(names: &[&str]) -> Vec<MockTrainer> {
            names
                .iter()
                .map(|n| MockTrainer {
                    name: n.to_string(),
                    calls: Calls::default(),
                    storage: Vec::new(),
                })
                .collect()
        }
    }

    impl AgentTrainer for MockTrainer {
        fn name(&self) -> &str {
            &self.name
        }

        fn action(&mut self, obs: &[f32]) -> Action {
            self.calls.actions += 1;
            self.calls.observed.push(obs[0]);
            vec![1.0, 0.0]
        }

        fn experience(
            &mut self,
            obs: &[f32],
            action: &[f32],
            reward: f64,
            next_obs: &[f32],
            done: bool,
            terminal: bool,
        ) {
            self.calls.experiences += 1;
            if terminal {
                self.calls.terminals += 1;
            }
            self.storage.push(Experience {
                obs: obs.to_vec(),
                action: action.to_vec(),
                reward,
                next_obs: next_obs.to_vec(),
                done,
            });
        }

        fn preupdate(&mut self) {
            self.calls.preupdates += 1;
        }

        fn peer_sample(&self, _request: &SampleRequest) -> PeerSample {
            PeerSample {
                trainer: self.name.clone(),
                batch: Vec::new(),
            }
        }

        fn update(
            &mut self,
            _peers: &[PeerSample],
            _train_step: u64,
        ) -> Result<Option<UpdateStats>, Box<dyn Error>> {
            self.calls.updates += 1;
            Ok(None)
        }

        fn replay_storage(&self) -> &[Experience] {
            &self.storage
        }

        fn training_state_json(&self) -> Result<String, serde_json::Error> {
            serde_json::to_string(&self.name)
        }

        fn restore_training_state_json(&mut self, _json: &str) -> Result<(), Box<dyn Error>> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct SinkLog {
        frames: usize,
        closes: usize,
    }

    struct MockSink(Rc<RefCell<SinkLog>>);

    impl VideoSink for MockSink {
        fn write_frame(&mut self, _frame: &RgbFrame) -> Result<(), RecordingError> {
            self.0.borrow_mut().frames += 1;
            Ok(())
        }

        fn close(&mut self) -> Result<usize, RecordingError> {
            let mut log = self.0.borrow_mut();
            log.closes += 1;
            Ok(log.frames)
        }
    }

    struct MockViewer(Rc<RefCell<usize>>);

    impl Viewer for MockViewer {
        fn show(&mut self, _scene: &Scene) -> io::Result<()> {
            *self.0.borrow_mut() += 1;
            Ok(())
        }
    }

    fn settings(dir: &Path) -> LoopSettings {
        LoopSettings {
            max_episode_len: 3,
            num_episodes: 1000,
            save_rate: 1000,
            render_delay: Duration::ZERO,
            exp_name: "exp".to_string(),
            benchmark_dir: dir.join("benchmark"),
            plots_dir: dir.join("plots"),
            ..Default::default()
        }
    }

    fn checkpoints(dir: &Path) -> CheckpointManager {
        CheckpointManager::new(
            CheckpointManagerConfig {
                save_dir: dir.join("policy"),
            },
            RunDescriptor {
                scenario: "scripted".to_string(),
                exp_name: "exp".to_string(),
                hyperparameters: TrainerParams::default(),
            },
        )
    }

    fn control_loop(
        dir: &Path,
        names: &[&str],
        settings: LoopSettings,
    ) -> ControlLoop<ScriptedEnv, MockTrainer> {
        std::fs::create_dir_all(&settings.benchmark_dir).unwrap();
        std::fs::create_dir_all(&settings.plots_dir).unwrap();
        ControlLoop::new(
            ScriptedEnv::new(names.len()),
            MockTrainer::roster(names),
            settings,
            checkpoints(dir),
        )
        .with_seed(11)
    }

    fn updates(cl: &ControlLoop<ScriptedEnv, MockTrainer>) -> Vec<usize> {
        cl.trainers().iter().map(|t| t.calls.updates).collect()
    }

    #[test]
    fn test_ledger_holds_one_entry_per_episode_plus_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut cl = control_loop(dir.path(), &["a", "b"], settings(dir.path()));
        for _ in 0..20 {
            cl.step().unwrap();
            let completed = cl.ledger().completed();
            assert_eq!(cl.ledger().len(), completed + 1);
            assert!(cl.ledger().agent_rewards().iter().all(|a| a.len() == completed + 1));
        }
        assert_eq!(cl.ledger().completed(), 6);
        assert_eq!(cl.ledger().episode_rewards()[0], 6.0);
        assert_eq!(cl.benchmark().len(), 7);
    }

    #[test]
    fn test_terminal_resets_episode() {
        let dir = tempfile::tempdir().unwrap();
        let mut cl = control_loop(dir.path(), &["a"], settings(dir.path()));
        cl.step().unwrap();
        cl.step().unwrap();
        assert_eq!(cl.episode_step(), 2);
        assert_eq!(cl.state(), LoopState::RunningEpisode);
        cl.step().unwrap();
        assert_eq!(cl.episode_step(), 0);
        assert_eq!(cl.state(), LoopState::EpisodeBoundary);
        assert_eq!(cl.train_step(), 3);
        assert_eq!(cl.trainers()[0].calls.terminals, 1);
    }

    #[test]
    fn test_checkpoint_every_save_rate_terminal_episodes() {
        let dir = tempfile::tempdir().unwrap();
        let s = LoopSettings {
            save_rate: 2,
            ..settings(dir.path())
        };
        let mut cl = control_loop(dir.path(), &["a", "b"], s);
        for _ in 0..15 {
            cl.step().unwrap();
        }
        // 5 completed episodes => checkpoints after episodes 2 and 4, each
        // averaging the last closed episode with the fresh zero entry
        assert_eq!(cl.ledger().final_rewards(), &[3.0, 3.0]);
        assert_eq!(cl.ledger().final_agent_rewards(), &[1.5, 1.5, 1.5, 1.5]);

        let data = CheckpointManager::load(&dir.path().join("policy")).unwrap();
        assert_eq!(data.metadata.episodes, 4);
        assert_eq!(data.metadata.train_step, 12);
        assert_eq!(data.metadata.trainers, vec!["a", "b"]);
    }

    #[test]
    fn test_done_without_terminal_never_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let s = LoopSettings {
            save_rate: 1,
            max_episode_len: 10,
            ..settings(dir.path())
        };
        let mut cl = control_loop(dir.path(), &["a"], s);
        cl.env.done_every = Some(2);
        for _ in 0..8 {
            cl.step().unwrap();
        }
        assert_eq!(cl.ledger().completed(), 4);
        assert!(cl.ledger().final_rewards().is_empty());
        assert!(!dir.path().join("policy").exists());
    }

    #[test]
    fn test_zero_save_rate_never_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let s = LoopSettings {
            save_rate: 0,
            num_episodes: 3,
            ..settings(dir.path())
        };
        let mut cl = control_loop(dir.path(), &["a", "b"], s);
        let outcome = cl.run().unwrap();

        assert!(matches!(outcome, RunOutcome::TrainingFinished { episodes: 4, .. }));
        assert!(cl.ledger().final_rewards().is_empty());
        assert!(cl.ledger().final_agent_rewards().is_empty());
        assert!(!dir.path().join("policy").exists());
    }

    #[test]
    fn test_every_trainer_updates_once_per_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut cl = control_loop(dir.path(), &["a", "b", "c"], settings(dir.path()));
        for _ in 0..5 {
            cl.step().unwrap();
        }
        assert_eq!(updates(&cl), vec![5, 5, 5]);
        assert!(cl.trainers().iter().all(|t| t.calls.preupdates == 5));
    }

    #[test]
    fn test_shared_updates_only_first_in_roster() {
        let dir = tempfile::tempdir().unwrap();
        let s = LoopSettings {
            shared: true,
            ..settings(dir.path())
        };
        let mut cl = control_loop(dir.path(), &["good", "good", "good"], s);
        for _ in 0..7 {
            cl.step().unwrap();
        }
        assert_eq!(updates(&cl), vec![7, 0, 0]);
        assert!(cl.trainers().iter().all(|t| t.calls.preupdates == 7));
    }

    #[test]
    fn test_benchmark_records_experience_without_updates() {
        let dir = tempfile::tempdir().unwrap();
        let s = LoopSettings {
            benchmark: true,
            benchmark_iters: 5,
            shuffle: Some(ShuffleMode::Timestep),
            ..settings(dir.path())
        };
        let mut cl = control_loop(dir.path(), &["a", "b"], s);
        let outcome = cl.run().unwrap();

        let path = dir.path().join("benchmark").join("exp.pkl");
        assert_eq!(outcome, RunOutcome::BenchmarkFinished { path: path.clone() });
        assert_eq!(cl.state(), LoopState::BenchmarkTerminating);
        assert_eq!(cl.train_step(), 6);
        assert_eq!(cl.roster().order(), &[0, 1]);
        for t in cl.trainers() {
            assert_eq!(t.calls.experiences, 6);
            assert_eq!(t.calls.updates, 0);
            assert_eq!(t.calls.preupdates, 0);
        }

        let bytes = std::fs::read(&path).unwrap();
        let episodes: Vec<Vec<Vec<u32>>> =
            serde_pickle::from_slice(&bytes, DeOptions::new()).unwrap();
        assert_eq!(episodes, vec![vec![vec![1, 2, 3]; 2]; 2]);

        // flushed buffer is back to a single empty slot
        assert_eq!(cl.benchmark().len(), 1);
        assert!(cl.benchmark().closed().is_empty());
    }

    #[test]
    fn test_benchmark_waits_for_episode_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let s = LoopSettings {
            benchmark: true,
            benchmark_iters: 4,
            max_episode_len: 10,
            ..settings(dir.path())
        };
        let mut cl = control_loop(dir.path(), &["a"], s);
        for _ in 0..9 {
            assert!(cl.step().unwrap().is_none());
        }
        assert!(cl.step().unwrap().is_some());
        assert_eq!(cl.train_step(), 10);
    }

    #[test]
    fn test_training_ends_after_num_episodes_with_two_curves() {
        let dir = tempfile::tempdir().unwrap();
        let s = LoopSettings {
            num_episodes: 3,
            max_episode_len: 2,
            save_rate: 2,
            ..settings(dir.path())
        };
        let mut cl = control_loop(dir.path(), &["a", "b"], s);
        let outcome = cl.run().unwrap();

        let plots = dir.path().join("plots");
        assert_eq!(
            outcome,
            RunOutcome::TrainingFinished {
                episodes: 4,
                rewards_file: plots.join("exp_rewards.pkl"),
                agrewards_file: plots.join("exp_agrewards.pkl"),
            }
        );
        assert_eq!(cl.state(), LoopState::TrainingTerminating);
        assert_eq!(cl.train_step(), 8);
        assert_eq!(std::fs::read_dir(&plots).unwrap().count(), 2);

        let rewards: Vec<f64> = serde_pickle::from_slice(
            &std::fs::read(plots.join("exp_rewards.pkl")).unwrap(),
            DeOptions::new(),
        )
        .unwrap();
        assert_eq!(rewards, vec![2.0, 2.0]);
        let agrewards: Vec<f64> = serde_pickle::from_slice(
            &std::fs::read(plots.join("exp_agrewards.pkl")).unwrap(),
            DeOptions::new(),
        )
        .unwrap();
        assert_eq!(agrewards, vec![1.0; 4]);
    }

    #[test]
    fn test_recording_captures_first_episode_only() {
        let dir = tempfile::tempdir().unwrap();
        let log = Rc::new(RefCell::new(SinkLog::default()));
        let shown = Rc::new(RefCell::new(0));
        let mut cl = control_loop(dir.path(), &["a", "b"], settings(dir.path()))
            .with_viewer(Box::new(MockViewer(shown.clone())))
            .with_recorder(Box::new(MockSink(log.clone())), Camera::new(32, 32));

        let outcome = cl.run().unwrap();
        assert_eq!(outcome, RunOutcome::RecordingFinished { frames: 3 });
        assert_eq!(cl.state(), LoopState::RecordingTerminating);
        assert_eq!(log.borrow().frames, 3);
        assert_eq!(log.borrow().closes, 1);
        assert_eq!(*shown.borrow(), 3);
        assert_eq!(cl.env.resets, 1);
        assert_eq!(cl.ledger().completed(), 0);
    }

    #[test]
    fn test_episode_shuffle_only_at_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let s = LoopSettings {
            shuffle: Some(ShuffleMode::Episode),
            ..settings(dir.path())
        };
        let mut cl = control_loop(dir.path(), &["a", "b", "c", "d"], s);
        let mut changes = 0;
        for _ in 0..60 {
            let before = cl.roster().order().to_vec();
            cl.step().unwrap();
            if cl.roster().order() != before.as_slice() {
                changes += 1;
                assert_eq!(cl.state(), LoopState::EpisodeBoundary);
            }
        }
        assert!(changes > 0);
    }

    #[test]
    fn test_timestep_shuffle_pairs_roster_with_slots() {
        let dir = tempfile::tempdir().unwrap();
        let s = LoopSettings {
            shuffle: Some(ShuffleMode::Timestep),
            max_episode_len: 100,
            ..settings(dir.path())
        };
        let mut cl = control_loop(dir.path(), &["a", "b", "c", "d"], s);
        let mut changes = 0;
        for _ in 0..30 {
            let before = cl.roster().order().to_vec();
            cl.step().unwrap();
            let order = cl.roster().order().to_vec();
            if order != before {
                changes += 1;
            }
            // roster position k acted on slot k
            for (slot, &i) in order.iter().enumerate() {
                let observed = &cl.trainers()[i].calls.observed;
                assert_eq!(observed.last(), Some(&(slot as f32)));
            }
        }
        assert!(changes > 0);
        assert_eq!(cl.ledger().completed(), 0);
    }

    #[test]
    fn test_no_shuffle_keeps_identity() {
        let dir = tempfile::tempdir().unwrap();
        let mut cl = control_loop(dir.path(), &["a", "b", "c"], settings(dir.path()));
        for _ in 0..12 {
            cl.step().unwrap();
        }
        assert_eq!(cl.roster().order(), &[0, 1, 2]);
        assert!(cl.trainers().iter().all(|t| t.calls.actions == 12));
    }
}
