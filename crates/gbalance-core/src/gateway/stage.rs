/// Steps of one generate request, in order. A failure at any step ends the
/// request with the error of that step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticating,
    ResolvingModel,
    SelectingKey,
    TranslatingRequest,
    CallingUpstream,
    TranslatingResponse,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Authenticating => "authenticating",
            Stage::ResolvingModel => "resolving_model",
            Stage::SelectingKey => "selecting_key",
            Stage::TranslatingRequest => "translating_request",
            Stage::CallingUpstream => "calling_upstream",
            Stage::TranslatingResponse => "translating_response",
            Stage::Done => "done",
        }
    }
}
