//! Controller of one signal location.
//!
//! A location carries up to three signals: main, distant and shunting. Both
//! the initial setup and every aspect change fork one region per signal; a
//! missing signal completes its region at once. The join back into `Idle`
//! fires once all three regions are completed.

use crate::builder::{BuildError, TableBuilder, TransitionBuilder};
use crate::core::choice;
use crate::engine::{Machine, Runtime, Statechart, StatechartError, Table};
use crate::machines::Aspect;
use crate::settings::{millis, SignalControllerSettings};
use crate::state_enum;
use std::sync::Arc;

state_enum! {
    pub enum SignalControllerState {
        WaitForStart,
        Init,
        InitMainTurn,
        InitMainCompleted,
        InitDistantTurn,
        InitDistantCompleted,
        InitShuntTurn,
        InitShuntCompleted,
        Operating,
        Idle,
        Turning,
        TurnMain,
        TurnMainCompleted,
        TurnDistant,
        TurnDistantCompleted,
        TurnShunt,
        TurnShuntCompleted,
        Failed,
    }
    composite: {
        Init => InitShuntCompleted,
        Operating => TurnShuntCompleted,
        Turning => TurnShuntCompleted,
    }
    initial: {
        Init => [InitMainTurn, InitDistantTurn, InitShuntTurn],
        Operating => [Idle],
        Turning => [TurnMain, TurnDistant, TurnShunt],
    }
    slots: {
        1 => [InitDistantTurn, InitDistantCompleted, TurnDistant, TurnDistantCompleted],
        2 => [InitShuntTurn, InitShuntCompleted, TurnShunt, TurnShuntCompleted],
    }
    error: [Failed]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalControllerEvent {
    Start,
    /// Show a new aspect on every signal of the location.
    Enable(Aspect),
    CompletedMain,
    CompletedDistant,
    CompletedShunt,
    Failed,
    Clear,
    InitTimeout,
    TurnTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalControllerOutput {
    Started,
    Completed,
    Failed,
}

pub trait SignalControllerCallback: Send + Sync {
    fn has_main(&self) -> bool;
    fn has_distant(&self) -> bool;
    fn has_shunt(&self) -> bool;
    fn turn_main(&self, aspect: Aspect);
    fn turn_distant(&self, aspect: Aspect);
    fn turn_shunt(&self, aspect: Aspect);
    fn fail(&self);
}

pub struct SignalController {
    callback: Option<Arc<dyn SignalControllerCallback>>,
    settings: SignalControllerSettings,
    aspect: Aspect,
}

impl SignalController {
    pub fn new(settings: SignalControllerSettings) -> Self {
        Self {
            callback: None,
            settings,
            aspect: Aspect::Stop,
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn SignalControllerCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Arc<dyn SignalControllerCallback>) {
        self.callback = Some(callback);
    }

    /// Aspect of the last `Enable`.
    pub fn aspect(&self) -> Aspect {
        self.aspect
    }

    fn call(&self, f: impl FnOnce(&dyn SignalControllerCallback)) {
        if let Some(callback) = &self.callback {
            f(callback.as_ref());
        }
    }

    fn has(&self, f: impl FnOnce(&dyn SignalControllerCallback) -> bool) -> bool {
        self.callback.as_ref().is_some_and(|cb| f(cb.as_ref()))
    }
}

impl Default for SignalController {
    fn default() -> Self {
        Self::new(SignalControllerSettings::default())
    }
}

type Edge = TransitionBuilder<SignalController>;
type Predicate = fn(&dyn SignalControllerCallback) -> bool;
type Done = fn(&SignalControllerEvent) -> bool;

/// One signal's region: its turn and completed states, the presence check
/// and the completion event.
#[derive(Clone, Copy)]
struct Region {
    turn: SignalControllerState,
    completed: SignalControllerState,
    present: Predicate,
    done: Done,
}

fn regions() -> [Region; 6] {
    use SignalControllerState::*;

    let main: Predicate = |cb| cb.has_main();
    let distant: Predicate = |cb| cb.has_distant();
    let shunt: Predicate = |cb| cb.has_shunt();
    let main_done: Done = |e| matches!(e, SignalControllerEvent::CompletedMain);
    let distant_done: Done = |e| matches!(e, SignalControllerEvent::CompletedDistant);
    let shunt_done: Done = |e| matches!(e, SignalControllerEvent::CompletedShunt);

    let region = |turn, completed, present, done| Region {
        turn,
        completed,
        present,
        done,
    };
    [
        region(InitMainTurn, InitMainCompleted, main, main_done),
        region(InitDistantTurn, InitDistantCompleted, distant, distant_done),
        region(InitShuntTurn, InitShuntCompleted, shunt, shunt_done),
        region(TurnMain, TurnMainCompleted, main, main_done),
        region(TurnDistant, TurnDistantCompleted, distant, distant_done),
        region(TurnShunt, TurnShuntCompleted, shunt, shunt_done),
    ]
}

fn all_active(rt: &Runtime<SignalController>, states: [SignalControllerState; 3]) -> bool {
    states.into_iter().all(|state| rt.is_state_active(state))
}

impl Machine for SignalController {
    type State = SignalControllerState;
    type Event = SignalControllerEvent;
    type Output = SignalControllerOutput;

    const NAME: &'static str = "SignalController";
    const REGIONS: usize = 3;
    const TIMERS: usize = 2;
    const MAX_ARMED: usize = 1;

    fn define(&self) -> Result<Table<Self>, BuildError> {
        use SignalControllerState::*;

        let mut table = TableBuilder::<Self>::new()
            .initial(WaitForStart)
            .on_entry(InitMainTurn, |sc, _| sc.call(|cb| cb.turn_main(Aspect::Stop)))
            .on_entry(InitDistantTurn, |sc, _| sc.call(|cb| cb.turn_distant(Aspect::Stop)))
            .on_entry(InitShuntTurn, |sc, _| sc.call(|cb| cb.turn_shunt(Aspect::Stop)))
            .on_entry(TurnMain, |sc, _| sc.call(|cb| cb.turn_main(sc.aspect)))
            .on_entry(TurnDistant, |sc, _| sc.call(|cb| cb.turn_distant(sc.aspect)))
            .on_entry(TurnShunt, |sc, _| sc.call(|cb| cb.turn_shunt(sc.aspect)))
            .on_entry(Failed, |sc, rt| {
                sc.call(|cb| cb.fail());
                rt.emit(SignalControllerOutput::Failed);
            })
            .timer(
                Init,
                millis(self.settings.init_timeout_ms),
                SignalControllerEvent::InitTimeout,
            )
            .timer(
                Turning,
                millis(self.settings.turn_timeout_ms),
                SignalControllerEvent::TurnTimeout,
            )
            .transition(
                Edge::new()
                    .from(WaitForStart)
                    .on(|e| matches!(e, SignalControllerEvent::Start))
                    .to(Init),
            )?
            .transition(
                Edge::new()
                    .from(Init)
                    .when(|_, rt| {
                        all_active(rt, [InitMainCompleted, InitDistantCompleted, InitShuntCompleted])
                    })
                    .to(Idle)
                    .effect(|_, rt| rt.emit(SignalControllerOutput::Started)),
            )?
            .transition(
                Edge::new()
                    .from(Idle)
                    .on(|e| matches!(e, SignalControllerEvent::Enable(_)))
                    .to(Turning)
                    .effect(|sc, rt| {
                        if let Some(SignalControllerEvent::Enable(aspect)) = rt.event() {
                            sc.aspect = *aspect;
                        }
                    }),
            )?
            .transition(
                Edge::new()
                    .from(Turning)
                    .when(|_, rt| {
                        all_active(rt, [TurnMainCompleted, TurnDistantCompleted, TurnShuntCompleted])
                    })
                    .to(Idle)
                    .effect(|_, rt| rt.emit(SignalControllerOutput::Completed)),
            )?
            .transition(
                Edge::new()
                    .from(Init)
                    .on(|e| matches!(e, SignalControllerEvent::InitTimeout))
                    .to(Failed),
            )?
            .transition(
                Edge::new()
                    .from(Turning)
                    .on(|e| matches!(e, SignalControllerEvent::TurnTimeout))
                    .to(Failed),
            )?
            .transition(
                Edge::new()
                    .from(Failed)
                    .on(|e| matches!(e, SignalControllerEvent::Clear))
                    .to(Init),
            )?;

        for region in regions() {
            let (turn, completed, present) = (region.turn, region.completed, region.present);
            table = table
                .initial_choice(turn, move |sc, _| {
                    choice(|| sc.has(present), turn).otherwise(completed)
                })
                .transition(Edge::new().from(turn).on(region.done).to(completed))?;
        }
        for source in [Init, Operating] {
            table = table.transition(
                Edge::new()
                    .from(source)
                    .on(|e| matches!(e, SignalControllerEvent::Failed))
                    .to(Failed),
            )?;
        }
        table.build()
    }

    fn check(&self) -> bool {
        self.callback.is_some()
    }
}

impl Statechart<SignalController> {
    pub fn raise_start(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalControllerEvent::Start)
    }

    pub fn raise_enable(&mut self, aspect: Aspect) -> Result<(), StatechartError> {
        self.raise(SignalControllerEvent::Enable(aspect))
    }

    pub fn raise_completed_main(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalControllerEvent::CompletedMain)
    }

    pub fn raise_completed_distant(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalControllerEvent::CompletedDistant)
    }

    pub fn raise_completed_shunt(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalControllerEvent::CompletedShunt)
    }

    pub fn raise_failed(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalControllerEvent::Failed)
    }

    pub fn raise_clear(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalControllerEvent::Clear)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockSignalController;
    use super::*;
    use crate::engine::OutputLog;
    use crate::machines::testing::elapse;
    use crate::timer::VirtualTimerService;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    type Chart = Statechart<SignalController>;

    fn fixture(
        main: bool,
        distant: bool,
        shunt: bool,
    ) -> (Chart, Arc<MockSignalController>, Arc<VirtualTimerService>) {
        let mock = Arc::new(MockSignalController::with_signals(main, distant, shunt));
        let timers = Arc::new(VirtualTimerService::new());
        let mut chart =
            Statechart::new(SignalController::default().with_callback(mock.clone())).unwrap();
        chart.set_timer_service(timers.clone());
        (chart, mock, timers)
    }

    fn complete(chart: &mut Chart, signal: usize) {
        match signal {
            0 => chart.raise_completed_main().unwrap(),
            1 => chart.raise_completed_distant().unwrap(),
            _ => chart.raise_completed_shunt().unwrap(),
        }
    }

    #[test]
    fn location_without_signals_starts_at_once() {
        let (mut chart, mock, _timers) = fixture(false, false, false);
        chart.enter().unwrap();
        chart.raise_start().unwrap();

        assert!(chart.is_state_active(SignalControllerState::Idle));
        assert!(chart.is_raised(&SignalControllerOutput::Started));
        assert!(mock.take_turns().is_empty());
        assert_eq!(chart.armed_timers(), 0);
    }

    #[test]
    fn init_join_fires_once_in_any_order() {
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in orders {
            let (mut chart, mock, _timers) = fixture(true, true, true);
            let log = Arc::new(OutputLog::new());
            chart.subscribe(log.clone());
            chart.enter().unwrap();
            chart.raise_start().unwrap();
            assert_eq!(
                mock.take_turns(),
                vec![("main", Aspect::Stop), ("distant", Aspect::Stop), ("shunt", Aspect::Stop)]
            );

            for (index, signal) in order.into_iter().enumerate() {
                assert!(chart.is_state_active(SignalControllerState::Init), "{order:?}");
                complete(&mut chart, signal);
                if index < 2 {
                    assert!(!log.is_raised(&SignalControllerOutput::Started));
                }
            }

            assert!(chart.is_state_active(SignalControllerState::Idle), "{order:?}");
            assert_eq!(log.count(&SignalControllerOutput::Started), 1, "{order:?}");
        }
    }

    #[test]
    fn enable_turns_present_signals_only() {
        let (mut chart, mock, _timers) = fixture(true, true, false);
        chart.enter().unwrap();
        chart.raise_start().unwrap();
        chart.raise_completed_main().unwrap();
        chart.raise_completed_distant().unwrap();
        assert!(chart.is_state_active(SignalControllerState::Idle));
        mock.take_turns();

        chart.raise_enable(Aspect::Go).unwrap();
        assert!(chart.is_state_active(SignalControllerState::Turning));
        assert!(chart.is_state_active(SignalControllerState::TurnShuntCompleted));
        assert_eq!(mock.take_turns(), vec![("main", Aspect::Go), ("distant", Aspect::Go)]);
        assert_eq!(chart.machine().aspect(), Aspect::Go);

        chart.raise_completed_distant().unwrap();
        assert!(!chart.is_raised(&SignalControllerOutput::Completed));

        chart.raise_completed_main().unwrap();
        assert!(chart.is_state_active(SignalControllerState::Idle));
        assert!(chart.is_raised(&SignalControllerOutput::Completed));
        assert_eq!(chart.armed_timers(), 0);
    }

    #[test]
    fn turn_timeout_fails_the_location() {
        let (mut chart, mock, timers) = fixture(true, false, false);
        chart.enter().unwrap();
        chart.raise_start().unwrap();
        chart.raise_completed_main().unwrap();
        chart.raise_enable(Aspect::Slow).unwrap();

        elapse(&mut chart, &timers, Duration::from_millis(4999));
        assert!(chart.is_state_active(SignalControllerState::Turning));

        elapse(&mut chart, &timers, Duration::from_millis(1));
        assert_eq!(chart.active_states(), vec![SignalControllerState::Failed]);
        assert!(chart.is_raised(&SignalControllerOutput::Failed));
        assert_eq!(mock.fails.load(Ordering::SeqCst), 1);
        assert_eq!(timers.armed_count(chart.handle()), 0);

        chart.raise_clear().unwrap();
        assert!(chart.is_state_active(SignalControllerState::InitMainTurn));
    }

    #[test]
    fn failed_leaves_every_region() {
        let (mut chart, _mock, _timers) = fixture(true, true, true);
        chart.enter().unwrap();
        chart.raise_start().unwrap();
        chart.raise_completed_shunt().unwrap();

        chart.raise_failed().unwrap();
        assert_eq!(chart.active_states(), vec![SignalControllerState::Failed]);
        assert_eq!(chart.armed_timers(), 0);
    }
}
