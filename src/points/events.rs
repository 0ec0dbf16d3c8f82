use super::PointState;

/// Published whenever a point changes its logical state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointChangeEvent {
    pub piece_id: String,
    pub previous_state: PointState,
    pub new_state: PointState,
    /// False when the change came from automation rather than the user
    pub user_initiated: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Listener = Box<dyn FnMut(&PointChangeEvent)>;

/// Subscribers of point changes, called in subscription order.
#[derive(Default)]
pub(super) struct PointListeners {
    next_id: usize,
    listeners: Vec<(ListenerId, Listener)>,
}

impl PointListeners {
    pub(super) fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(super) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let len = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != len
    }

    pub(super) fn notify(&mut self, event: &PointChangeEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for PointListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}
