//! Демонстрация framebus
//!
//! Собирает в памяти страницу с Agent-ом и несколькими фреймами, в каждом
//! из которых работает Bus, и прогоняет сценарий публикации: фреймы
//! подписываются на событие, отдельный фрейм-издатель публикует его
//! несколько раз, после чего печатается статистика.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use framebus::{
    logging::init_logging, Agent, AgentStats, Bus, BusStats, EventLoop, ExecutionBudget,
    IntoBudget, MessageHost, Settings, Window,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "framebus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("FRAMEBUS_GIT_COMMIT"),
    ", built ",
    env!("FRAMEBUS_BUILD_TIME"),
    ")"
))]
#[command(about = "In-process demo of the framebus Agent/Bus protocol", long_about = None)]
struct Cli {
    /// Файл настроек
    #[arg(
        short,
        long,
        default_value = framebus::config::DEFAULT_CONFIG_FILE,
        env = "FRAMEBUS_CONFIG"
    )]
    config: PathBuf,
    /// Имя события (по умолчанию из настроек)
    #[arg(short, long)]
    event: Option<String>,
    /// Сколько раз опубликовать событие
    #[arg(short = 'n', long)]
    count: Option<u64>,
    /// Сколько фреймов-подписчиков встроить
    #[arg(short, long)]
    frames: Option<usize>,
    /// Бюджет каждого подписчика: число или "any"
    #[arg(short, long, default_value = "any")]
    budget: String,
    /// Подробный вывод (debug)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Только предупреждения и ошибки
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Serialize)]
struct FrameReport {
    origin: String,
    received: u64,
    bus: BusStats,
}

#[derive(Debug, Serialize)]
struct ScenarioReport {
    event: String,
    published: u64,
    budget: String,
    agent: AgentStats,
    remaining_subscriptions: usize,
    frames_ready: u64,
    frames: Vec<FrameReport>,
    loop_delivered: u64,
    loop_rejected: u64,
}

/// Число из командной строки или строка как есть (`"any"`).
fn parse_budget(raw: &str) -> Result<ExecutionBudget> {
    let budget = match raw.trim().parse::<u64>() {
        Ok(n) => n.into_budget(),
        Err(_) => raw.trim().into_budget(),
    };
    budget.with_context(|| format!("invalid --budget '{raw}'"))
}

/// Крутит цикл событий, пока очередь не опустеет.
async fn settle(el: &EventLoop) {
    while el.pending() > 0 {
        tokio::task::yield_now().await;
    }
}

async fn run_scenario(
    settings: &Settings,
    budget: ExecutionBudget,
) -> Result<ScenarioReport> {
    let demo = &settings.demo;
    let el = EventLoop::new();
    let page = Window::new(&el, settings.agent.origin.clone());
    let agent = Agent::with_config(page.clone(), settings.agent.agent_config())
        .context("cannot start agent")?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let driver = {
        let el = el.clone();
        tokio::spawn(async move {
            el.run_until(async {
                let _ = stop_rx.await;
            })
            .await;
        })
    };

    let ready = Arc::new(AtomicU64::new(0));
    {
        let ready = ready.clone();
        agent.on("frame-ready", move |payload, source| {
            ready.fetch_add(1, Ordering::Relaxed);
            debug!(%payload, source = ?source.map(|s| s.id()), "Frame reported ready");
        });
    }

    let mut subscribers = Vec::with_capacity(demo.frames);
    for i in 0..demo.frames {
        let frame = page.create_frame(format!("https://frame-{i}.local"));
        let bus = Bus::with_config(frame.clone(), settings.bus.clone())
            .with_context(|| format!("cannot start bus in frame {i}"))?;

        let received = Arc::new(AtomicU64::new(0));
        let counter = received.clone();
        let origin = frame.origin().to_string();
        bus.exactly(budget, demo.event.as_str(), move |payload| {
            counter.fetch_add(1, Ordering::Relaxed);
            debug!(frame = %origin, %payload, "Frame received event");
        })?;
        bus.send_to_agent("frame-ready", json!({ "frame": i }));

        subscribers.push((frame, bus, received));
    }
    settle(&el).await;

    let publisher_frame = page.create_frame("https://publisher.local");
    let publisher =
        Bus::with_config(publisher_frame, settings.bus.clone()).context("cannot start publisher")?;
    for n in 1..=demo.count {
        publisher.publish(&demo.event, json!({ "n": n }));
        settle(&el).await;
    }

    let _ = stop_tx.send(());
    driver.await.context("event loop driver failed")?;

    let mut rejected = page.rejected_count();
    let frames = subscribers
        .into_iter()
        .map(|(frame, bus, received)| {
            rejected += frame.rejected_count();
            FrameReport {
                origin: frame.origin().to_string(),
                received: received.load(Ordering::Relaxed),
                bus: bus.stats(),
            }
        })
        .collect();

    Ok(ScenarioReport {
        event: demo.event.clone(),
        published: demo.count,
        budget: budget.to_string(),
        agent: agent.stats(),
        remaining_subscriptions: agent.listener_count(&demo.event),
        frames_ready: ready.load(Ordering::Relaxed),
        frames,
        loop_delivered: el.stats().delivered,
        loop_rejected: rejected,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;
    if let Some(event) = cli.event {
        settings.demo.event = event;
    }
    if let Some(count) = cli.count {
        settings.demo.count = count;
    }
    if let Some(frames) = cli.frames {
        settings.demo.frames = frames;
    }
    if cli.verbose {
        settings.logging.level = "debug".to_string();
    } else if cli.quiet {
        settings.logging.level = "warn".to_string();
    }
    let budget = parse_budget(&cli.budget)?;

    let logging = init_logging(settings.logging.clone()).context("failed to initialize logging")?;
    info!(
        event = %settings.demo.event,
        frames = settings.demo.frames,
        count = settings.demo.count,
        %budget,
        "Running framebus demo"
    );

    let report = run_scenario(&settings, budget).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    logging.shutdown();
    Ok(())
}
