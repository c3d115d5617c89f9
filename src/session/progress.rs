/// Rotating status phrases shown while an analysis is in flight.
const PHRASES: &[&str] = &[
    "Identificando ingredientes...",
    "Estimando porções visíveis...",
    "Calculando calorias e macros...",
    "Gerando recomendações...",
];

/// Wording used once the wait runs long. Display only, never control flow.
const ELEVATED_PHRASE: &str = "Quase lá! Refinando a análise...";

/// Ticks before the elevated-wait wording kicks in.
const ELEVATED_WAIT_TICKS: u32 = 8;

/// Sub-status of the `Analyzing` state, advanced by an explicit scheduled
/// tick the driver stops feeding once the state machine leaves `Analyzing`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisProgress {
    ticks: u32,
}

impl AnalysisProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub fn elevated_wait(&self) -> bool {
        self.ticks > ELEVATED_WAIT_TICKS
    }

    pub fn phrase(&self) -> &'static str {
        if self.elevated_wait() {
            ELEVATED_PHRASE
        } else {
            PHRASES[(self.ticks as usize) % PHRASES.len()]
        }
    }
}
