#![warn(missing_docs)]

//! Runtime context for a single mutator

use std::collections::VecDeque;
use std::panic;

use crate::boxed::heap::collect::Collector;
use crate::boxed::{AsHeap, Heap};
use crate::config::RuntimeConfig;
use crate::fault::{self, Fault, FaultCode, Result};
use crate::word::Word;

/// Interrupt number raised when the timer expires
pub const TIMER_INTERRUPT: u8 = 255;

/// Native stack headroom check
#[derive(Copy, Clone, Debug)]
struct StackGuard {
    base: usize,
    size: usize,
    reserve: usize,
}

impl StackGuard {
    fn new(size: usize, reserve: usize) -> StackGuard {
        StackGuard {
            base: stack_pointer(),
            size,
            reserve,
        }
    }

    fn used(&self) -> usize {
        let current = stack_pointer();

        // The stack may grow in either direction
        if current <= self.base {
            self.base - current
        } else {
            current - self.base
        }
    }

    fn check(&self) -> Result<()> {
        if self.used().saturating_add(self.reserve) > self.size {
            Err(Fault::at(FaultCode::StackOverflow, "stack-check"))
        } else {
            Ok(())
        }
    }
}

/// Returns an address within the caller's stack frame
#[inline(never)]
fn stack_pointer() -> usize {
    let marker = 0u8;
    &marker as *const u8 as usize
}

/// Cooperative interrupt state
#[derive(Debug)]
struct Interrupts {
    enabled: bool,
    period: u32,
    countdown: u32,
    pending: VecDeque<u8>,
}

impl Interrupts {
    fn new(period: u32) -> Interrupts {
        Interrupts {
            enabled: true,
            period,
            countdown: period,
            pending: VecDeque::new(),
        }
    }

    fn raise(&mut self, reason: u8) {
        if !self.pending.contains(&reason) {
            self.pending.push_back(reason);
        }
    }
}

/// Runtime context owning a heap
///
/// A task is the single mutator of its heap. It checks native stack headroom, counts down to timer
/// interrupts and hands the heap to an installed [`Collector`] when allocation needs more space.
pub struct Task {
    heap: Heap,
    config: RuntimeConfig,
    stack: StackGuard,
    interrupts: Interrupts,
    collector: Option<Box<dyn Collector>>,
}

impl Task {
    /// Creates a task with an empty heap
    ///
    /// The stack guard measures from the caller's frame.
    pub fn new(config: RuntimeConfig) -> Task {
        log::debug!(
            "starting task with {} byte stack and {} interrupt period",
            config.stack_size,
            config.timer_period
        );

        Task {
            heap: Heap::new(&config),
            stack: StackGuard::new(config.stack_size, config.stack_reserve),
            interrupts: Interrupts::new(config.timer_period),
            collector: None,
            config,
        }
    }

    /// Returns this task's heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Returns a mutable reference to this task's heap
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Returns the configuration this task was created with
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Installs the collector used when allocation runs out of space
    pub fn set_collector(&mut self, collector: Box<dyn Collector>) {
        self.collector = Some(collector);
    }

    /// Removes the installed collector
    pub fn take_collector(&mut self) -> Option<Box<dyn Collector>> {
        self.collector.take()
    }

    /// Ensures `words` words can be allocated
    ///
    /// The collector is invoked at most once. If the space is still short afterwards this faults
    /// with [`FaultCode::OutOfMemory`].
    pub fn reserve(&mut self, words: usize) -> Result<()> {
        if self.heap.demand(words) {
            return Ok(());
        }

        if let Some(mut collector) = self.collector.take() {
            log::debug!(
                "{} words requested with {} free; invoking collector",
                words,
                self.heap.free_words()
            );

            let result = collector.reclaim(&mut self.heap, words);
            self.collector = Some(collector);
            result?;

            if self.heap.demand(words) {
                return Ok(());
            }
        }

        Err(Fault::at(FaultCode::OutOfMemory, "reserve").with_operand(Word::fix(words as isize)))
    }

    /// Faults if the native stack is within the reserve of its limit
    pub fn stack_overflow_check(&self) -> Result<()> {
        self.stack.check()
    }

    /// Counts down to the next timer interrupt and returns the next interrupt to dispatch
    ///
    /// Interrupts raised while disabled stay pending until they are enabled again.
    pub fn poll_interrupt(&mut self) -> Option<u8> {
        let interrupts = &mut self.interrupts;

        interrupts.countdown = interrupts.countdown.saturating_sub(1);
        if interrupts.countdown == 0 {
            interrupts.countdown = interrupts.period;
            interrupts.raise(TIMER_INTERRUPT);
        }

        if interrupts.enabled {
            interrupts.pending.pop_front()
        } else {
            None
        }
    }

    /// Queues an interrupt for dispatch
    ///
    /// Raising an interrupt that is already pending has no effect.
    pub fn raise_interrupt(&mut self, reason: u8) {
        log::trace!("raising interrupt {}", reason);
        self.interrupts.raise(reason);
    }

    /// Returns the interrupts waiting for dispatch in order
    pub fn pending_interrupts(&self) -> impl Iterator<Item = u8> + '_ {
        self.interrupts.pending.iter().copied()
    }

    /// Allows pending interrupts to be dispatched
    pub fn enable_interrupts(&mut self) {
        self.interrupts.enabled = true;
    }

    /// Holds interrupts until they are enabled again
    pub fn disable_interrupts(&mut self) {
        self.interrupts.enabled = false;
    }

    /// Returns if interrupts are dispatched
    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts.enabled
    }

    /// Sets the number of polls between timer interrupts and restarts the countdown
    pub fn set_timer_period(&mut self, period: u32) {
        self.interrupts.period = period;
        self.interrupts.countdown = period;
    }

    /// Returns the number of polls between timer interrupts
    pub fn timer_period(&self) -> u32 {
        self.interrupts.period
    }

    /// Runs `f` recovering any fault it raises
    ///
    /// Faults returned as `Err` and faults raised with [`Fault::raise`] are both returned. Other
    /// panics continue unwinding.
    pub fn run<R>(&mut self, f: impl FnOnce(&mut Task) -> Result<R>) -> Result<R> {
        let result = fault::catch_fault(panic::AssertUnwindSafe(|| f(self))).and_then(|r| r);

        if let Err(fault) = &result {
            log::debug!("task operation faulted: {}", fault);
        }
        result
    }
}

impl Default for Task {
    fn default() -> Task {
        Task::new(RuntimeConfig::default())
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        log::debug!(
            "finishing task after {} collections with {} roots",
            self.heap.collections(),
            self.heap.roots().len()
        );
    }
}

impl AsHeap for Task {
    fn as_heap(&self) -> &Heap {
        &self.heap
    }

    fn as_heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::boxed::types::list;

    fn small_task() -> Task {
        Task::new(RuntimeConfig::default().with_heap_words(64).with_timer_period(3))
    }

    #[test]
    fn reserve_without_collector() {
        let mut task = small_task();

        assert!(task.reserve(64).is_ok());
        let fault = task.reserve(65).unwrap_err();
        assert_eq!(FaultCode::OutOfMemory, fault.code());
        assert_eq!(&[Word::fix(65)], fault.operands());
    }

    struct Resizer;

    impl Collector for Resizer {
        fn reclaim(&mut self, heap: &mut Heap, words: usize) -> Result<()> {
            heap.begin_collection(Some(heap.current_space().capacity() + words));
            heap.evacuate_roots()?;
            heap.end_collection();
            Ok(())
        }
    }

    #[test]
    fn reserve_invokes_collector() {
        let mut task = small_task();
        task.set_collector(Box::new(Resizer));

        task.reserve(100).unwrap();
        assert_eq!(1, task.heap().collections());
        assert!(task.heap().demand(100));
        assert!(task.take_collector().is_some());
    }

    #[test]
    fn timer_interrupts() {
        let mut task = small_task();

        assert_eq!(None, task.poll_interrupt());
        assert_eq!(None, task.poll_interrupt());
        assert_eq!(Some(TIMER_INTERRUPT), task.poll_interrupt());
        assert_eq!(None, task.poll_interrupt());

        task.disable_interrupts();
        task.raise_interrupt(2);
        task.raise_interrupt(2);
        assert_eq!(None, task.poll_interrupt());
        assert_eq!(None, task.poll_interrupt());
        assert_eq!(vec![2, TIMER_INTERRUPT], task.pending_interrupts().collect::<Vec<_>>());

        task.enable_interrupts();
        assert_eq!(Some(2), task.poll_interrupt());
        assert_eq!(Some(TIMER_INTERRUPT), task.poll_interrupt());

        task.set_timer_period(1);
        assert_eq!(1, task.timer_period());
        assert_eq!(Some(TIMER_INTERRUPT), task.poll_interrupt());
    }

    fn recurse(task: &Task, depth: usize) -> Result<usize> {
        let padding = std::hint::black_box([0u8; 512]);
        task.stack_overflow_check()?;

        if depth == 0 {
            Ok(padding.len())
        } else {
            recurse(task, depth - 1).map(|n| n + padding[depth % 512] as usize)
        }
    }

    #[test]
    fn stack_overflow() {
        let task = Task::new(
            RuntimeConfig::default()
                .with_heap_words(16)
                .with_stack_size(0x18000)
                .with_stack_reserve(0x10000),
        );

        assert!(recurse(&task, 4).is_ok());
        assert_eq!(
            FaultCode::StackOverflow,
            recurse(&task, 10_000).unwrap_err().code()
        );
    }

    #[test]
    fn run_recovers_raised_faults() {
        let mut task = small_task();

        let returned = task.run(|task| list::car(&*task, Word::fix(1)));
        assert_eq!(FaultCode::NoPair, returned.unwrap_err().code());

        let raised: Result<()> = task.run(|_| Fault::new(FaultCode::OutOfRange).raise());
        assert_eq!(FaultCode::OutOfRange, raised.unwrap_err().code());

        let pair = task
            .run(|task| list::cons(task, Word::fix(1), Word::END_OF_LIST))
            .unwrap();
        assert_eq!(Word::fix(1), list::car(&task, pair).unwrap());
    }
}
