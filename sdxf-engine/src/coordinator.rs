use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use sdxf_core::entity::Entity;
use sdxf_core::scene::SceneInput;
use sdxf_core::strategy::{AdvancedOptions, ConversionSettings, ConversionStrategy};
use sdxf_io::{DrawingEncoder, DxfEncoder};
use tracing::{debug, error, info, warn};

use crate::errors::{EngineError, PipelineError};
use crate::placeholder::PlaceholderGenerator;
use crate::traverse::SceneTraverser;

/// 协作式取消标记。克隆共享同一个标志位，任意线程都可以请求取消。
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// 循环入口处的检查点。
    #[inline]
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// 一次转换所需的全部输入，整体移交给工作线程。
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub document: SceneInput,
    pub strategy: ConversionStrategy,
    pub options: AdvancedOptions,
    /// 占位实体的随机种子；为空时使用系统熵。
    pub seed: Option<u64>,
}

impl ConversionRequest {
    pub fn new(document: SceneInput, strategy: ConversionStrategy, options: AdvancedOptions) -> Self {
        Self {
            document,
            strategy,
            options,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Completed(String),
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionState {
    Idle,
    Running,
    Completed(String),
    Cancelled,
    Failed(String),
}

impl ConversionState {
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, ConversionState::Running)
    }

    pub fn outcome(&self) -> Option<ConversionOutcome> {
        match self {
            ConversionState::Idle | ConversionState::Running => None,
            ConversionState::Completed(text) => Some(ConversionOutcome::Completed(text.clone())),
            ConversionState::Cancelled => Some(ConversionOutcome::Cancelled),
            ConversionState::Failed(message) => Some(ConversionOutcome::Failed(message.clone())),
        }
    }
}

impl From<ConversionOutcome> for ConversionState {
    fn from(outcome: ConversionOutcome) -> Self {
        match outcome {
            ConversionOutcome::Completed(text) => ConversionState::Completed(text),
            ConversionOutcome::Cancelled => ConversionState::Cancelled,
            ConversionOutcome::Failed(message) => ConversionState::Failed(message),
        }
    }
}

/// 在当前线程上执行完整流水线：遍历（或占位）→ 编码。
///
/// 取消优先于故障：只要标志位已置位，结果就是 `Cancelled`，且不会调用编码器。
pub fn convert<E: DrawingEncoder + ?Sized>(
    request: &ConversionRequest,
    encoder: &E,
    token: &CancellationToken,
) -> ConversionOutcome {
    let mut rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    convert_with_rng(request, encoder, token, &mut rng)
}

/// 同 [`convert`]，占位实体改用调用方提供的随机源（忽略 `request.seed`）。
pub fn convert_with_rng<E: DrawingEncoder + ?Sized, R: Rng>(
    request: &ConversionRequest,
    encoder: &E,
    token: &CancellationToken,
    rng: &mut R,
) -> ConversionOutcome {
    let entities = match build_entities(request, token, rng) {
        Ok(entities) => entities,
        Err(err) if token.is_cancelled() || err == PipelineError::Cancelled => {
            info!("转换已取消，丢弃已生成的实体");
            return ConversionOutcome::Cancelled;
        }
        Err(err) => {
            error!(error = %err, "转换失败");
            return ConversionOutcome::Failed(err.to_string());
        }
    };

    if token.is_cancelled() {
        info!(entities = entities.len(), "编码前检测到取消请求");
        return ConversionOutcome::Cancelled;
    }

    let text = encoder.encode(&entities, &request.strategy);
    debug!(entities = entities.len(), bytes = text.len(), "转换完成");
    ConversionOutcome::Completed(text)
}

fn build_entities<R: Rng>(
    request: &ConversionRequest,
    token: &CancellationToken,
    rng: &mut R,
) -> Result<Vec<Entity>, PipelineError> {
    token.check()?;
    let settings = ConversionSettings::resolve(&request.strategy, &request.options);

    let entities = match &request.document {
        SceneInput::Scene(graph) => {
            SceneTraverser::new(&graph.geometries, &settings, token).collect(&graph.roots)?
        }
        SceneInput::Unrecognized => Vec::new(),
    };
    if !entities.is_empty() {
        return Ok(entities);
    }

    warn!(
        simplify_factor = request.strategy.simplify_factor,
        "未找到可用几何体，生成占位实体"
    );
    PlaceholderGenerator::new(&settings, token).generate(request.strategy.simplify_factor, rng)
}

struct RunningTask {
    token: CancellationToken,
    handle: JoinHandle<ConversionOutcome>,
}

/// 在后台线程上运行转换任务，同一时刻最多一个任务处于 Running。
pub struct ConversionCoordinator<E = DxfEncoder> {
    encoder: Arc<E>,
    state: ConversionState,
    task: Option<RunningTask>,
}

impl ConversionCoordinator<DxfEncoder> {
    pub fn new() -> Self {
        Self::with_encoder(DxfEncoder::new())
    }
}

impl Default for ConversionCoordinator<DxfEncoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ConversionCoordinator<E>
where
    E: DrawingEncoder + Send + Sync + 'static,
{
    pub fn with_encoder(encoder: E) -> Self {
        Self {
            encoder: Arc::new(encoder),
            state: ConversionState::Idle,
            task: None,
        }
    }

    /// 启动后台任务。调用方保留 `token` 的克隆即可在任意线程请求取消。
    pub fn start(
        &mut self,
        request: ConversionRequest,
        token: CancellationToken,
    ) -> Result<(), EngineError> {
        self.refresh();
        if self.task.is_some() {
            return Err(EngineError::TaskAlreadyRunning);
        }

        let encoder = Arc::clone(&self.encoder);
        let worker_token = token.clone();
        let handle = thread::Builder::new()
            .name("sdxf-conversion".to_string())
            .spawn(move || convert(&request, encoder.as_ref(), &worker_token))
            .map_err(EngineError::Spawn)?;

        info!("转换任务已启动");
        self.task = Some(RunningTask { token, handle });
        self.state = ConversionState::Running;
        Ok(())
    }

    /// 请求取消当前任务；没有运行中的任务时返回 `false`。
    pub fn cancel(&self) -> bool {
        match &self.task {
            Some(task) => {
                task.token.cancel();
                true
            }
            None => false,
        }
    }

    /// 非阻塞地查看当前状态。
    pub fn state(&mut self) -> &ConversionState {
        self.refresh();
        &self.state
    }

    /// 阻塞直到任务结束并返回结果。
    pub fn wait(&mut self) -> Result<ConversionOutcome, EngineError> {
        if let Some(task) = self.task.take() {
            let outcome = join_outcome(task);
            self.state = outcome.clone().into();
            return Ok(outcome);
        }
        self.state.outcome().ok_or(EngineError::NotStarted)
    }

    fn refresh(&mut self) {
        let finished = self
            .task
            .as_ref()
            .is_some_and(|task| task.handle.is_finished());
        if finished {
            if let Some(task) = self.task.take() {
                self.state = join_outcome(task).into();
            }
        }
    }
}

fn join_outcome(task: RunningTask) -> ConversionOutcome {
    let RunningTask { token, handle } = task;
    handle.join().unwrap_or_else(|_| {
        if token.is_cancelled() {
            info!("转换线程在取消后异常退出，按取消处理");
            return ConversionOutcome::Cancelled;
        }
        error!("转换线程异常退出");
        ConversionOutcome::Failed("conversion worker panicked".to_string())
    })
}
