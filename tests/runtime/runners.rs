//! Integration tests for command runners

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use parley_foundation::{ConsoleInvoker, Invoker};
use parley_parser::ArgumentCollection;
use parley_runtime::{CommandContext, CommandRunner, CompletionFn, Execution, Response, RunnerState, Step};

fn context(command: &str) -> CommandContext {
    let invoker: Arc<dyn Invoker> = Arc::new(ConsoleInvoker::new("ada"));
    CommandContext::new(command, Vec::new(), command, ArgumentCollection::detached(), invoker)
}

fn counting_completion(count: &Arc<AtomicUsize>, last: &Arc<Mutex<Option<Response>>>) -> CompletionFn {
    let count = Arc::clone(count);
    let last = Arc::clone(last);
    Box::new(move |ctx: CommandContext| {
        count.fetch_add(1, Ordering::SeqCst);
        *last.lock().unwrap() = ctx.response().cloned();
    })
}

fn current_thread() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

fn countdown(steps: u32) -> Execution {
    Execution::stepped(move |_| {
        let mut remaining = steps;
        move |ctx: &mut CommandContext| -> anyhow::Result<Step> {
            remaining -= 1;
            if remaining > 0 {
                return Ok(Step::Yield);
            }
            ctx.respond_ok("done")?;
            Ok(Step::Done)
        }
    })
}

#[test]
fn stepped_runner_finishes_once_steps_are_exhausted() {
    let rt = current_thread();
    let fired = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let mut runner = CommandRunner::create(countdown(3));
    assert_eq!(runner.state(), RunnerState::Idle);

    runner.run(context("count"), counting_completion(&fired, &last), rt.handle());
    assert_eq!(runner.state(), RunnerState::InProgress);
    assert!(!runner.should_continue());

    runner.poll();
    assert!(!runner.should_continue());
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    runner.poll();
    assert!(runner.should_continue());
    assert_eq!(runner.state(), RunnerState::Finished);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(*last.lock().unwrap(), Some(Response::ok("done")));

    runner.poll();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn run_is_ignored_while_in_progress() {
    let rt = current_thread();
    let fired = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let mut runner = CommandRunner::create(countdown(2));

    runner.run(context("count"), counting_completion(&fired, &last), rt.handle());
    runner.run(context("count"), counting_completion(&fired, &last), rt.handle());
    runner.poll();
    assert!(runner.is_finished());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn finished_runners_reset_for_reuse() {
    let rt = current_thread();
    let fired = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let mut runner = CommandRunner::create(countdown(1));
    assert!(!runner.reset());

    runner.run(context("count"), counting_completion(&fired, &last), rt.handle());
    assert!(runner.should_pool());
    assert!(runner.reset());
    assert_eq!(runner.state(), RunnerState::Idle);

    runner.run(context("count"), counting_completion(&fired, &last), rt.handle());
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn handler_errors_and_panics_become_failures() {
    let rt = current_thread();
    let fired = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));

    let mut failing = CommandRunner::create(Execution::sync(|_| Err(anyhow::anyhow!("disk full"))));
    failing.run(context("save"), counting_completion(&fired, &last), rt.handle());
    assert_eq!(
        *last.lock().unwrap(),
        Some(Response::fail("command `save` failed: disk full"))
    );

    let mut panicking = CommandRunner::create(Execution::sync(|_| panic!("boom")));
    panicking.run(context("explode"), counting_completion(&fired, &last), rt.handle());
    let response = last.lock().unwrap().clone().unwrap();
    assert!(response.is_fail());
    assert!(response.message.contains("panicked: boom"), "{}", response.message);
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn silent_handlers_get_an_empty_ok() {
    let rt = current_thread();
    let fired = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let mut runner = CommandRunner::create(Execution::sync(|_| Ok(())));
    runner.run(context("noop"), counting_completion(&fired, &last), rt.handle());
    assert_eq!(*last.lock().unwrap(), Some(Response::empty()));
}

#[test]
fn worker_runner_applies_result_on_poll() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let mut runner = CommandRunner::create(Execution::worker(|request| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, anyhow::Error>(Response::ok(format!("{} by {}", request.command, request.invoker.name())))
    }));
    assert!(!runner.should_pool());

    runner.run(context("fetch"), counting_completion(&fired, &last), rt.handle());
    assert!(runner.is_in_progress());
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    let deadline = Instant::now() + Duration::from_secs(5);
    while !runner.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
        runner.poll();
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(*last.lock().unwrap(), Some(Response::ok("fetch by ada")));
}

#[test]
fn worker_failures_are_faults() {
    let rt = tokio::runtime::Builder::new_multi_thread().worker_threads(1).build().unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let mut runner = CommandRunner::create(Execution::worker(|_| async move {
        Err::<Response, _>(anyhow::anyhow!("upstream timed out"))
    }));

    runner.run(context("fetch"), counting_completion(&fired, &last), rt.handle());
    let deadline = Instant::now() + Duration::from_secs(5);
    while !runner.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
        runner.poll();
    }
    assert_eq!(
        *last.lock().unwrap(),
        Some(Response::fail("command `fetch` failed: upstream timed out"))
    );
}
