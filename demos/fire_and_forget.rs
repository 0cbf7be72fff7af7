//! # Example: Fire-and-forget waves
//!
//! Spawns a few self-destroying tracked tasks, waits for all of them with a
//! [`JoinAll`], and drives the frames with tokio.
//!
//! - Each wave is a [`TrackedTask`] in its own container.
//! - `destroy_on_complete` is on (the [`Config`] default): containers vanish after completion.
//! - One wave is stopped halfway; the join still finishes.
//!
//! Run with:
//! ```bash
//! cargo run --example fire_and_forget --features logging
//! ```

use std::rc::Rc;
use std::time::Duration;

use tickvisor::{
    Config, Driver, EventKind, JoinAll, LogWriter, Scheduler, Subscribe, TaskFn, TaskRef,
    TrackedTask, Wait, next_frame,
};

fn wave(sched: &Scheduler, name: &'static str, frames: u32) -> anyhow::Result<TrackedTask> {
    let routine: TaskRef = TaskFn::rc(name, move || Wait::steps(frames));
    let task = TrackedTask::create(sched, Some(routine), name, None)?;
    task.subscribe_all(Rc::new(LogWriter::new()) as Rc<dyn Subscribe>);
    Ok(task)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let sched = Scheduler::new(Config {
        frame: Duration::from_millis(16),
        max_frames: 600,
        ..Config::default()
    });

    let fast = wave(&sched, "fast", 5)?;
    let slow = wave(&sched, "slow", 40)?;
    let doomed = wave(&sched, "doomed", 1_000)?;

    let stopper = doomed.clone();
    fast.subscribe(EventKind::Completed, move |_: &tickvisor::Event| stopper.stop());

    let members: Vec<TaskRef> = vec![
        Rc::new(fast) as TaskRef,
        Rc::new(slow) as TaskRef,
        Rc::new(doomed) as TaskRef,
    ];
    let join = JoinAll::named("waves", members, &sched);
    let all_done = join.clone();

    sched.start(
        sched.root(),
        tickvisor::FutureRoutine::new(async move {
            while !all_done.is_finished() {
                next_frame().await;
            }
            tracing::info!("all waves settled");
        }),
    )?;
    sched.start(sched.root(), join)?;

    let report = Driver::new(sched.clone()).run_until_idle().await?;
    tracing::info!(
        frames = report.frames,
        containers = sched.children_of(sched.root()).len(),
        "done"
    );
    Ok(())
}
