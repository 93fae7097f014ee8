//! Runtime configuration

/// Direction bump allocation moves through a space
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Growth {
    /// Allocation starts at the lowest address and moves up
    Upward,
    /// Allocation starts at the highest address and moves down
    Downward,
}

/// Operand sizes where bignum algorithms switch to their asymptotically faster variants
///
/// These only affect performance. The defaults were picked to amortise allocation overhead.
/// Division has no threshold; it uses Knuth's algorithm D at every size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Thresholds {
    /// Digit count of the smaller factor above which multiplication uses Karatsuba
    pub karatsuba: usize,
    /// Expected output characters above which string conversion divides and conquers
    pub recursive_to_string: usize,
}

impl Thresholds {
    pub const DEFAULT: Thresholds = Thresholds {
        karatsuba: 70,
        recursive_to_string: 750,
    };
}

impl Default for Thresholds {
    fn default() -> Thresholds {
        Thresholds::DEFAULT
    }
}

/// Configuration for a [`Task`](crate::task::Task)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of each managed semispace in words
    pub heap_words: usize,
    /// Capacity of the permanent space in words
    pub permanent_words: usize,
    /// Direction of bump allocation in the managed space
    pub growth: Growth,
    /// Native stack size in bytes
    pub stack_size: usize,
    /// Stack headroom in bytes kept free for fault reporting
    pub stack_reserve: usize,
    /// Interrupt checks between timer interrupts
    pub timer_period: u32,
    pub thresholds: Thresholds,
}

impl RuntimeConfig {
    pub const DEFAULT_HEAP_WORDS: usize = 1 << 20;
    pub const DEFAULT_PERMANENT_WORDS: usize = 1 << 16;
    pub const DEFAULT_STACK_RESERVE: usize = 0x10000;
    pub const DEFAULT_TIMER_PERIOD: u32 = 10000;

    const FALLBACK_STACK_SIZE: usize = 1 << 20;

    pub fn with_heap_words(mut self, heap_words: usize) -> RuntimeConfig {
        self.heap_words = heap_words;
        self
    }

    pub fn with_permanent_words(mut self, permanent_words: usize) -> RuntimeConfig {
        self.permanent_words = permanent_words;
        self
    }

    pub fn with_growth(mut self, growth: Growth) -> RuntimeConfig {
        self.growth = growth;
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> RuntimeConfig {
        self.stack_size = stack_size;
        self
    }

    pub fn with_stack_reserve(mut self, stack_reserve: usize) -> RuntimeConfig {
        self.stack_reserve = stack_reserve;
        self
    }

    pub fn with_timer_period(mut self, timer_period: u32) -> RuntimeConfig {
        self.timer_period = timer_period;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> RuntimeConfig {
        self.thresholds = thresholds;
        self
    }

    /// Returns the soft stack limit of the current process
    #[cfg(unix)]
    pub fn default_stack_size() -> usize {
        let mut limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };

        let result = unsafe { libc::getrlimit(libc::RLIMIT_STACK, &mut limit) };
        if result != 0 || limit.rlim_cur == libc::RLIM_INFINITY {
            return Self::FALLBACK_STACK_SIZE;
        }

        limit.rlim_cur as usize
    }

    /// Returns a conservative stack size for platforms without resource limits
    #[cfg(not(unix))]
    pub fn default_stack_size() -> usize {
        Self::FALLBACK_STACK_SIZE
    }
}

impl Default for RuntimeConfig {
    fn default() -> RuntimeConfig {
        RuntimeConfig {
            heap_words: Self::DEFAULT_HEAP_WORDS,
            permanent_words: Self::DEFAULT_PERMANENT_WORDS,
            growth: Growth::Upward,
            stack_size: Self::default_stack_size(),
            stack_reserve: Self::DEFAULT_STACK_RESERVE,
            timer_period: Self::DEFAULT_TIMER_PERIOD,
            thresholds: Thresholds::default(),
        }
    }
}
