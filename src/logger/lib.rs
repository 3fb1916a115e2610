#[derive(Debug, Clone)]
pub enum Logger {
    DevNull,
    CommandLine(Verbosity),
}

impl Logger {
    pub fn log(&self, message: &str) {
        match self {
            Logger::DevNull => {}
            Logger::CommandLine(verbosity) => {
                if !matches!(verbosity, Verbosity::Quiet) {
                    println!("{}", message);
                }
            }
        }
    }

    /// Problems the user should see even though the run succeeded
    pub fn log_warning(&self, message: &str) {
        match self {
            Logger::DevNull => {}
            Logger::CommandLine(verbosity) => {
                if !matches!(verbosity, Verbosity::Quiet) {
                    eprintln!("warning: {}", message);
                }
            }
        }
    }

    pub fn log_debug(&self, message: &str) {
        if self.can_log_debug() {
            println!("{}", message);
        }
    }

    /// Per node tracing, only shown at the most verbose level
    pub fn log_trace(&self, message: &str) {
        if self.can_log_trace() {
            println!("{}", message);
        }
    }

    pub fn can_log_trace(&self) -> bool {
        matches!(self, Logger::CommandLine(Verbosity::DebuggingByLine))
    }

    pub fn can_log_debug(&self) -> bool {
        matches!(
            self,
            Logger::CommandLine(Verbosity::Debugging | Verbosity::DebuggingByLine)
        )
    }

    pub fn can_log_timing(&self) -> bool {
        match self {
            Logger::DevNull => false,
            Logger::CommandLine(verbosity) => {
                matches!(verbosity, Verbosity::Debugging | Verbosity::Timing)
            }
        }
    }

    pub fn get_verbosity(&self) -> Verbosity {
        match self {
            Logger::DevNull => Verbosity::Quiet,
            Logger::CommandLine(verbosity) => *verbosity,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Simple,
    Timing,
    Debugging,
    DebuggingByLine,
}
