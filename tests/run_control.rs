mod common;

use common::{assert_tree_invariants, board};
use std::thread;
use std::time::{Duration, Instant};
use test_env_log::test;
use uct_rs::game::Game;
use uct_rs::games::{Games, MnkAction};
use uct_rs::uct::{
    Cadence, ControlHandle, Controller, EngineError, Recorder, RunOutcome, SearchConfig,
};

fn wait_until_running(handle: &ControlHandle) {
    let start = Instant::now();
    while !handle.is_running() {
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "run never started"
        );
        thread::yield_now();
    }
}

#[test]
fn test_cancel_during_animated_run() {
    let config = SearchConfig::default().with_phase_delay(Duration::from_millis(1));
    let controller = Controller::new(board("XO_ _X_ O__"), config).unwrap();
    let handle = controller.handle();

    let outcome = thread::scope(|scope| {
        let run = scope.spawn(|| {
            let mut recorder = Recorder::<MnkAction>::new();
            controller.step_many_animated(1000, Cadence::Every(1), true, &mut recorder)
        });
        wait_until_running(&handle);
        thread::sleep(Duration::from_millis(50));
        assert!(handle.cancel());
        run.join().unwrap()
    })
    .unwrap();

    match outcome {
        RunOutcome::Cancelled { completed } => {
            assert!(completed < 1000);
            assert_eq!(controller.snapshot().iterations, completed);
            assert_eq!(controller.snapshot().root_visits, completed);
        }
        other => panic!("expected a cancelled run, got {:?}", other),
    }
    assert!(!handle.is_running());
    controller.inspect(assert_tree_invariants);
}

#[test]
fn test_cancel_during_batch() {
    let controller =
        Controller::new(Games::SixBySix.game().init_game(), SearchConfig::default()).unwrap();
    let handle = controller.handle();

    let outcome = thread::scope(|scope| {
        let run = scope.spawn(|| controller.run_batch(10_000_000, true, &mut ()));
        wait_until_running(&handle);
        thread::sleep(Duration::from_millis(20));
        assert!(handle.cancel());
        run.join().unwrap()
    })
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled { completed } if completed < 10_000_000));
    controller.inspect(assert_tree_invariants);

    // The tree survives a cancelled run and can be extended
    let visits = controller.snapshot().root_visits;
    controller.run_batch(10, false, &mut ()).unwrap();
    assert_eq!(controller.snapshot().root_visits, visits + 10);
}

#[test]
fn test_pause_does_not_change_the_result() {
    let start = Games::FourByFour.game().init_game();
    let uninterrupted = Controller::new(start.clone(), SearchConfig::default()).unwrap();
    uninterrupted.run_batch(3000, true, &mut ()).unwrap();

    let paused = Controller::new(start, SearchConfig::default()).unwrap();
    let handle = paused.handle();
    let outcome = thread::scope(|scope| {
        let run = scope.spawn(|| paused.run_batch(3000, true, &mut ()));
        wait_until_running(&handle);
        handle.pause();
        thread::sleep(Duration::from_millis(30));
        handle.resume();
        run.join().unwrap()
    })
    .unwrap();

    assert_eq!(outcome, RunOutcome::Completed { iterations: 3000 });
    assert_eq!(paused.snapshot().moves, uninterrupted.snapshot().moves);
    assert_eq!(paused.best_action(), uninterrupted.best_action());
}

#[test]
fn test_pausing_inside_visible_iterations_does_not_change_the_result() {
    let start = board("X__ _O_ ___");
    let config = SearchConfig::default().with_seed(11);
    let batch = Controller::new(start.clone(), config.clone()).unwrap();
    batch.run_batch(40, true, &mut ()).unwrap();

    let animated =
        Controller::new(start, config.with_phase_delay(Duration::from_millis(2))).unwrap();
    let handle = animated.handle();
    let outcome = thread::scope(|scope| {
        let run = scope.spawn(|| {
            let mut recorder = Recorder::<MnkAction>::new();
            animated.step_many_animated(40, Cadence::Every(1), true, &mut recorder)
        });
        wait_until_running(&handle);
        for _ in 0..5 {
            thread::sleep(Duration::from_millis(7));
            if !handle.pause() {
                break;
            }
            thread::sleep(Duration::from_millis(20));
            let held = animated.snapshot();
            thread::sleep(Duration::from_millis(20));
            assert_eq!(animated.snapshot(), held, "run moved while paused");
            assert!(handle.resume());
        }
        run.join().unwrap()
    })
    .unwrap();

    assert_eq!(outcome, RunOutcome::Completed { iterations: 40 });
    assert_eq!(animated.snapshot().moves, batch.snapshot().moves);
    assert_eq!(animated.best_action(), batch.best_action());
    animated.inspect(assert_tree_invariants);
}

#[test]
fn test_second_run_is_rejected_while_one_is_active() {
    let controller =
        Controller::new(Games::SixBySix.game().init_game(), SearchConfig::default()).unwrap();
    let handle = controller.handle();

    let outcome = thread::scope(|scope| {
        let run = scope.spawn(|| controller.run_batch(10_000_000, true, &mut ()));
        wait_until_running(&handle);
        assert!(handle.pause());
        assert!(handle.is_paused());

        assert_eq!(
            controller.run_batch(10, true, &mut ()),
            Err(EngineError::RunAlreadyActive)
        );
        assert_eq!(
            controller.step_once(&mut ()),
            Err(EngineError::RunAlreadyActive)
        );
        assert_eq!(
            controller.play(MnkAction::Place(0)),
            Err(EngineError::RunAlreadyActive)
        );
        assert_eq!(controller.reset(), Err(EngineError::RunAlreadyActive));
        assert_eq!(
            controller.set_exploration_constant(1.0),
            Err(EngineError::RunAlreadyActive)
        );

        // Cancelling a paused run wakes it up
        assert!(handle.cancel());
        run.join().unwrap()
    })
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled { .. }));
    assert!(!controller.pause());
    assert!(!controller.is_running());
    assert_eq!(controller.run_batch(5, false, &mut ()).map(RunOutcome::iterations), Ok(5));
}

#[test]
fn test_playing_moves_between_runs() {
    let controller = Controller::new(
        Games::TicTacToe.game().init_game(),
        SearchConfig::default().with_seed(7),
    )
    .unwrap();
    controller.run_batch(300, true, &mut ()).unwrap();
    let best = controller.best_action().unwrap();

    controller.play(best).unwrap();
    assert_eq!(controller.board().empty_cells(), 8);
    controller.inspect(|tree| assert_eq!(tree.len(), 1));
    assert_eq!(
        controller.play(best),
        Err(EngineError::InvalidMove(uct_rs::uct::GameError::Occupied(
            best.cell()
        )))
    );

    controller.run_batch(300, false, &mut ()).unwrap();
    let reply = controller.best_action().unwrap();
    assert_ne!(reply, best);
}
