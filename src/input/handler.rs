use crate::{
    input::events::{MapEvent, MapEventKind},
    prelude::HashMap,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::VecDeque;

type EventCallback = Box<dyn Fn(&MapEvent) + Send + Sync>;

/// Queues outbound map events and delivers them to listeners.
///
/// Events are delivered in emission order when [`EventManager::process_events`]
/// runs, either to callbacks registered per event kind or to channel
/// subscribers that receive every event.
#[derive(Default)]
pub struct EventManager {
    /// Event listeners by event kind
    listeners: HashMap<MapEventKind, Vec<EventCallback>>,
    /// Channel subscribers receiving every event
    subscribers: Vec<Sender<MapEvent>>,
    /// Event queue for processing
    event_queue: VecDeque<MapEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener
    pub fn on<F>(&mut self, kind: MapEventKind, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.listeners
            .entry(kind)
            .or_default()
            .push(Box::new(callback));
    }

    /// Opens a channel that receives every processed event
    pub fn subscribe(&mut self) -> Receiver<MapEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Emit an event to the queue. Nothing is delivered, and the queue keeps
    /// growing, until the host calls [`EventManager::process_events`].
    pub fn emit(&mut self, event: MapEvent) {
        self.event_queue.push_back(event);
    }

    /// Process all queued events
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        let events: Vec<_> = self.event_queue.drain(..).collect();

        for event in &events {
            if let Some(callbacks) = self.listeners.get(&event.kind()) {
                for callback in callbacks {
                    callback(event);
                }
            }
            // Drop subscribers whose receiver is gone
            self.subscribers
                .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        }

        events
    }

    /// Events emitted but not processed yet
    pub fn pending(&self) -> usize {
        self.event_queue.len()
    }

    /// Clear all events from the queue
    pub fn clear_events(&mut self) {
        self.event_queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_listeners_by_kind() {
        let mut manager = EventManager::new();
        let loaded = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loaded);
        manager.on(MapEventKind::MarkersLoaded, move |event| {
            if let MapEvent::MarkersLoaded { count, .. } = event {
                counter.fetch_add(*count, Ordering::SeqCst);
            }
        });

        manager.emit(MapEvent::MarkersLoaded {
            generation: 1,
            count: 4,
        });
        manager.emit(MapEvent::Ready);
        assert_eq!(manager.pending(), 2);

        let processed = manager.process_events();
        assert_eq!(processed.len(), 2);
        assert_eq!(loaded.load(Ordering::SeqCst), 4);
        assert_eq!(manager.pending(), 0);
    }

    #[test]
    fn test_subscribers_receive_in_order() {
        let mut manager = EventManager::new();
        let rx = manager.subscribe();
        let dropped = manager.subscribe();
        drop(dropped);

        manager.emit(MapEvent::BackgroundChanged { index: 1 });
        manager.emit(MapEvent::Ready);
        manager.process_events();

        assert_eq!(rx.try_recv().unwrap(), MapEvent::BackgroundChanged { index: 1 });
        assert_eq!(rx.try_recv().unwrap(), MapEvent::Ready);
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.subscribers.len(), 1);
    }
}
