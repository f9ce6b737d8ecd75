//! Redis publish/subscribe with a persisted message history.
//!
//! The publisher announces itself through a status key, publishes each
//! message on the configured channel and pushes it onto a history list.
//! The subscriber listens on a background thread and exposes the console
//! operations in [`console`].

pub mod console;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use redis::{Commands, Connection, RedisError};

use crate::config::BroadcastConfig;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

/// How often the listener wakes up to check whether it was stopped.
const LISTENER_POLL: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub enum BroadcastError {
    Redis(RedisError),
    /// `delete` was given an index outside the history list
    InvalidIndex { index: i64, len: usize },
    /// The listener thread panicked
    ListenerPanicked,
}

impl fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BroadcastError::Redis(e) => write!(f, "Redis error: {e}"),
            BroadcastError::InvalidIndex { index, len } => write!(
                f,
                "Invalid index {index}: history holds {len} message(s)"
            ),
            BroadcastError::ListenerPanicked => write!(f, "Subscriber listener panicked"),
        }
    }
}

impl std::error::Error for BroadcastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BroadcastError::Redis(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RedisError> for BroadcastError {
    fn from(err: RedisError) -> Self {
        BroadcastError::Redis(err)
    }
}

/// Entry point: one Redis client shared by publishers and subscribers.
#[derive(Clone)]
pub struct Broadcast {
    client: redis::Client,
    config: BroadcastConfig,
}

impl Broadcast {
    /// Parses the Redis URL. No connection is made until a publisher or
    /// subscriber is created.
    pub fn open(config: BroadcastConfig) -> Result<Self, BroadcastError> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    pub fn publisher(&self) -> Result<Publisher, BroadcastError> {
        Ok(Publisher {
            con: self.client.get_connection()?,
            config: self.config.clone(),
        })
    }

    pub fn subscriber(&self) -> Result<Subscriber, BroadcastError> {
        Ok(Subscriber {
            client: self.client.clone(),
            con: self.client.get_connection()?,
            config: self.config.clone(),
        })
    }
}

pub struct Publisher {
    con: Connection,
    config: BroadcastConfig,
}

impl Publisher {
    /// Marks the publisher as active.
    pub fn start(&mut self) -> Result<(), BroadcastError> {
        self.set_status(STATUS_ACTIVE)
    }

    /// Publishes `message` and records it in the history list.
    ///
    /// Returns the number of subscribers that received the message.
    pub fn publish(&mut self, message: &str) -> Result<usize, BroadcastError> {
        let receivers: usize = self.con.publish(&self.config.channel, message)?;
        let _: usize = self.con.lpush(&self.config.history_key, message)?;
        log::debug!(
            "published to {} ({} receiver(s))",
            self.config.channel,
            receivers
        );
        Ok(receivers)
    }

    /// Marks the publisher as inactive.
    pub fn stop(&mut self) -> Result<(), BroadcastError> {
        self.set_status(STATUS_INACTIVE)
    }

    pub fn status(&mut self) -> Result<Option<String>, BroadcastError> {
        Ok(self.con.get(&self.config.publisher_status_key)?)
    }

    fn set_status(&mut self, status: &str) -> Result<(), BroadcastError> {
        let _: () = self.con.set(&self.config.publisher_status_key, status)?;
        log::info!("publisher status: {}", status);
        Ok(())
    }
}

pub struct Subscriber {
    client: redis::Client,
    con: Connection,
    config: BroadcastConfig,
}

impl Subscriber {
    /// Channels this subscriber listens on.
    pub fn subscriptions(&self) -> Vec<String> {
        vec![self.config.channel.clone()]
    }

    /// Starts a background listener on its own connection.
    ///
    /// Payloads arrive on [`Listener::messages`] until the listener is
    /// stopped or the receiver is dropped.
    pub fn spawn_listener(&self) -> Result<Listener, BroadcastError> {
        let mut con = self.client.get_connection()?;
        let channels = self.subscriptions();
        let (tx, rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("tidepool-subscriber".to_string())
            .spawn(move || {
                let result = listen(&mut con, &channels, &stop_flag, &tx);
                if let Err(e) = &result {
                    log::error!("subscriber listener on {:?} failed: {}", channels, e);
                }
                result
            })
            .map_err(RedisError::from)?;

        Ok(Listener {
            messages: rx,
            stop,
            handle: Some(handle),
        })
    }

    /// Sets the subscriber status to active and reads it back.
    pub fn mark_active(&mut self) -> Result<Option<String>, BroadcastError> {
        let _: () = self.con.set(&self.config.subscriber_status_key, STATUS_ACTIVE)?;
        Ok(self.con.get(&self.config.subscriber_status_key)?)
    }

    /// The full history list, newest first.
    pub fn published_messages(&mut self) -> Result<Vec<String>, BroadcastError> {
        Ok(self.con.lrange(&self.config.history_key, 0, -1)?)
    }

    /// Publishes `message` on the admin channel.
    pub fn send_admin(&mut self, message: &str) -> Result<usize, BroadcastError> {
        Ok(self.con.publish(&self.config.admin_channel, message)?)
    }

    /// Removes the history entry at `index` and returns it.
    ///
    /// Removes one occurrence of that value, so duplicates further down the
    /// list are left alone. Negative or out-of-range indexes are rejected with
    /// [`BroadcastError::InvalidIndex`].
    pub fn delete_message(&mut self, index: i64) -> Result<String, BroadcastError> {
        let messages = self.published_messages()?;
        let message = history_entry(&messages, index)?.to_string();
        let _: usize = self.con.lrem(&self.config.history_key, 1, &message)?;
        Ok(message)
    }
}

/// The entry at `index`, counting from 0 at the newest message.
pub fn history_entry(messages: &[String], index: i64) -> Result<&str, BroadcastError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| messages.get(i))
        .map(String::as_str)
        .ok_or(BroadcastError::InvalidIndex {
            index,
            len: messages.len(),
        })
}

fn listen(
    con: &mut Connection,
    channels: &[String],
    stop: &AtomicBool,
    tx: &Sender<String>,
) -> Result<(), BroadcastError> {
    let mut pubsub = con.as_pubsub();
    for channel in channels {
        pubsub.subscribe(channel)?;
    }
    pubsub.set_read_timeout(Some(LISTENER_POLL))?;
    log::info!("subscribed to {:?}", channels);

    while !stop.load(Ordering::Relaxed) {
        let msg = match pubsub.get_message() {
            Ok(msg) => msg,
            Err(e) if e.is_timeout() => continue,
            Err(e) => return Err(e.into()),
        };
        let payload: String = msg.get_payload()?;
        if tx.send(payload).is_err() {
            break;
        }
    }
    Ok(())
}

/// Handle to a running subscriber listener.
pub struct Listener {
    pub messages: Receiver<String>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<(), BroadcastError>>>,
}

impl Listener {
    /// Signals the listener and waits for it to exit.
    pub fn stop(mut self) -> Result<(), BroadcastError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), BroadcastError> {
        self.stop.store(true, Ordering::Relaxed);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| BroadcastError::ListenerPanicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("subscriber listener exited with error: {}", e);
        }
    }
}
