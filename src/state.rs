/// Where the admin is in a multi-step private conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AdminState {
    #[default]
    Idle,
    AwaitingBroadcast,
    AwaitingInterval,
    AwaitingExplanation,
}
