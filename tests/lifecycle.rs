use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tickvisor::{
    Config, Driver, Event, EventKind, HostError, JoinAll, RoutineFn, RuntimeError, Scheduler,
    Step, Subscribe, TaskFn, TaskRef, TrackedTask, Wait,
};

type Seen = Rc<RefCell<Vec<usize>>>;

fn note(seen: &Seen, join: &Rc<RefCell<Option<JoinAll>>>) {
    let Some(remaining) = join.borrow().as_ref().and_then(JoinAll::remaining) else {
        return;
    };
    let mut seen = seen.borrow_mut();
    if seen.last() != Some(&remaining) {
        seen.push(remaining);
    }
}

/// Member that reports the combinator's counter on every step it takes.
fn observed(k: u32, seen: &Seen, join: &Rc<RefCell<Option<JoinAll>>>) -> TaskRef {
    let (seen, join) = (Rc::clone(seen), Rc::clone(join));
    TaskFn::rc(format!("steps{k}"), move || {
        let (seen, join) = (Rc::clone(&seen), Rc::clone(&join));
        let mut left = k;
        RoutineFn::new(move |_| {
            note(&seen, &join);
            left -= 1;
            if left == 0 { Step::Done } else { Step::Yield }
        })
    })
}

#[test]
fn join_over_one_two_three_steps() -> anyhow::Result<()> {
    let sched = Scheduler::default();
    let seen: Seen = Rc::new(RefCell::new(Vec::new()));
    let slot = Rc::new(RefCell::new(None));

    let members: Vec<TaskRef> = [1, 2, 3].iter().map(|&k| observed(k, &seen, &slot)).collect();
    let join = JoinAll::new(members, &sched);
    *slot.borrow_mut() = Some(join.clone());

    let handle = sched.start(sched.root(), join.clone())?;
    note(&seen, &slot);
    let mut composite_steps = 1;
    while !handle.is_finished() {
        sched.tick()?;
        note(&seen, &slot);
        composite_steps += 1;
    }

    assert_eq!(composite_steps, 3);
    assert_eq!(*seen.borrow(), vec![3, 2, 1, 0]);
    assert!(sched.is_idle());
    Ok(())
}

#[test]
fn join_over_tracked_tasks_reports_every_lifecycle() -> anyhow::Result<()> {
    let sched = Scheduler::default();
    let events: Rc<RefCell<Vec<(String, EventKind)>>> = Rc::new(RefCell::new(Vec::new()));

    let mut tracked = Vec::new();
    for (name, k) in [("a", 2), ("b", 3), ("c", 30)] {
        let routine: TaskRef = TaskFn::rc(name, move || Wait::steps(k));
        let task = TrackedTask::create(&sched, Some(routine), name, None)?;
        let out = Rc::clone(&events);
        task.subscribe_all(Rc::new(move |ev: &Event| {
            let name = ev.task.as_deref().unwrap_or_default().to_owned();
            out.borrow_mut().push((name, ev.kind));
        }) as Rc<dyn Subscribe>);
        tracked.push(task);
    }

    let members: Vec<TaskRef> = tracked
        .iter()
        .map(|t| Rc::new(t.clone()) as TaskRef)
        .collect();
    let join = JoinAll::named("wave", members, &sched);
    let handle = sched.start(sched.root(), join)?;

    sched.tick()?;
    sched.tick()?;
    // `c` is cut short by tearing down its container.
    sched.destroy_now(tracked[2].container())?;
    sched.tick()?;
    assert!(handle.is_finished());

    let events = events.borrow();
    let of = |name: &str| -> Vec<EventKind> {
        events
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, k)| *k)
            .collect()
    };
    assert_eq!(of("a"), vec![EventKind::Started, EventKind::Completed]);
    assert_eq!(of("b"), vec![EventKind::Started, EventKind::Completed]);
    assert_eq!(of("c"), vec![EventKind::Started, EventKind::Destroyed]);

    assert!(sched.children_of(sched.root()).is_empty());
    assert!(sched.is_idle());
    Ok(())
}

#[test]
fn dead_scheduler_is_reported() {
    let sched = Scheduler::default();
    let c = sched.create_container("orphan", None).unwrap();
    let task = TrackedTask::attach(&sched, c, Some(TaskFn::rc("t", || Wait::steps(2)))).unwrap();
    let join = JoinAll::new(Vec::<TaskRef>::new(), &sched);
    drop(sched);

    assert_eq!(task.run().unwrap_err(), HostError::SchedulerGone);
    assert_eq!(join.start_all(c).unwrap_err(), HostError::SchedulerGone);
    task.stop();
}

#[tokio::test(start_paused = true)]
async fn driver_runs_a_fire_and_forget_task_to_idle() -> anyhow::Result<()> {
    let sched = Scheduler::new(Config {
        frame: Duration::from_millis(10),
        ..Config::default()
    });
    let completed = Rc::new(Cell::new(0u32));
    let task = TrackedTask::create(
        &sched,
        Some(TaskFn::rc("pulse", || Wait::steps(5))),
        "pulse",
        None,
    )?;
    let hits = Rc::clone(&completed);
    task.subscribe(EventKind::Completed, move |_: &Event| hits.set(hits.get() + 1));
    let container = task.container();
    task.run()?;
    drop(task);

    let report = Driver::new(sched.clone()).run_until_idle().await?;
    assert_eq!(report.frames, 4);
    assert!(report.idle);
    assert_eq!(completed.get(), 1);
    assert!(!sched.is_alive(container));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn frame_budget_names_the_stragglers() {
    let sched = Scheduler::new(Config {
        frame: Duration::from_millis(1),
        max_frames: 10,
        ..Config::default()
    });
    let stuck: TaskRef = TaskFn::rc("stuck", || RoutineFn::new(|_| Step::Yield));
    let join = JoinAll::named("gate", [stuck], &sched);
    sched.spawn(sched.root(), &join).unwrap();

    let err = Driver::new(sched).run_until_idle().await.unwrap_err();
    match err {
        RuntimeError::FrameBudgetExceeded { frames, mut live } => {
            live.sort();
            assert_eq!(frames, 10);
            assert_eq!(live, vec!["gate".to_owned(), "stuck".to_owned()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}
