//! Scripted sensor double for engine tests.

use std::collections::{BTreeSet, VecDeque};
use std::vec::Vec;

use crate::sensor::{Match, Sensor, SensorResponse, Slot, TemplateId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    Verify,
    Capture,
    Convert(Slot),
    Search,
    Merge,
    Store(TemplateId),
    Count,
}

/// Pops scripted answers per operation. An exhausted script answers with the
/// idle default: no finger on capture, success everywhere else, not found on
/// search.
#[derive(Debug)]
pub(crate) struct ScriptedSensor {
    pub password: SensorResponse,
    pub captures: VecDeque<SensorResponse>,
    pub converts: VecDeque<SensorResponse>,
    pub searches: VecDeque<Result<Match, SensorResponse>>,
    pub merges: VecDeque<SensorResponse>,
    pub stores: VecDeque<SensorResponse>,
    pub library: BTreeSet<u16>,
    pub calls: Vec<Call>,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        ScriptedSensor {
            password: SensorResponse::Ok,
            captures: VecDeque::new(),
            converts: VecDeque::new(),
            searches: VecDeque::new(),
            merges: VecDeque::new(),
            stores: VecDeque::new(),
            library: BTreeSet::new(),
            calls: Vec::new(),
        }
    }

    pub fn with_captures(mut self, captures: &[SensorResponse]) -> Self {
        self.captures.extend(captures.iter().copied());
        self
    }

    pub fn with_converts(mut self, converts: &[SensorResponse]) -> Self {
        self.converts.extend(converts.iter().copied());
        self
    }

    pub fn count_of(&self, call: Call) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl Sensor for ScriptedSensor {
    fn verify_password(&mut self) -> SensorResponse {
        self.calls.push(Call::Verify);
        self.password
    }

    fn capture(&mut self) -> SensorResponse {
        self.calls.push(Call::Capture);
        self.captures.pop_front().unwrap_or(SensorResponse::NoFinger)
    }

    fn convert_to_template(&mut self, slot: Slot) -> SensorResponse {
        self.calls.push(Call::Convert(slot));
        self.converts.pop_front().unwrap_or(SensorResponse::Ok)
    }

    fn search(&mut self) -> Result<Match, SensorResponse> {
        self.calls.push(Call::Search);
        self.searches.pop_front().unwrap_or(Err(SensorResponse::NotFound))
    }

    fn merge_templates(&mut self) -> SensorResponse {
        self.calls.push(Call::Merge);
        self.merges.pop_front().unwrap_or(SensorResponse::Ok)
    }

    fn store(&mut self, id: TemplateId) -> SensorResponse {
        self.calls.push(Call::Store(id));
        let response = self.stores.pop_front().unwrap_or(SensorResponse::Ok);
        if response.is_ok() {
            self.library.insert(id.get());
        }
        response
    }

    fn template_count(&mut self) -> Result<u16, SensorResponse> {
        self.calls.push(Call::Count);
        Ok(self.library.len() as u16)
    }
}
