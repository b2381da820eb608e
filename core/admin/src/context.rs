/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation and deadline carried by a caller into every remote call.
///
/// The context is passed by reference through the services into the clients,
/// which wrap their network I/O in [`RequestContext::run`]. Dropping the
/// returned future also aborts the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancelled: Option<watch::Receiver<bool>>,
}

impl RequestContext {
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancelled: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earlier of the existing and the given deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Cancels the context once `true` is published on the channel.
    pub fn with_cancellation(mut self, cancelled: watch::Receiver<bool>) -> Self {
        self.cancelled = Some(cancelled);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .is_some_and(|cancelled| *cancelled.borrow())
    }

    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drives `future` to completion unless the context is cancelled or its
    /// deadline passes first, in which case the future is dropped.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(error) = self.err() {
            return Err(error);
        }

        let cancelled = async {
            match self.cancelled.clone() {
                Some(mut receiver) => {
                    if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
                        // Sender gone without cancelling, nothing can cancel us anymore.
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(ContextError::Cancelled),
            _ = expired => Err(ContextError::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_complete_future_without_deadline_or_cancellation() {
        let ctx = RequestContext::background();
        let result = ctx.run(async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn should_fail_with_deadline_exceeded_when_future_is_too_slow() {
        let ctx = RequestContext::background().with_timeout(Duration::from_millis(50));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn should_fail_with_cancelled_when_signal_is_published() {
        let (tx, rx) = watch::channel(false);
        let ctx = RequestContext::background().with_cancellation(rx);

        let handle = tokio::spawn(async move {
            ctx.run(std::future::pending::<()>()).await
        });
        tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), Err(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn should_not_start_future_on_already_cancelled_context() {
        let (_tx, rx) = watch::channel(true);
        let ctx = RequestContext::background().with_cancellation(rx);
        assert!(ctx.is_cancelled());

        let mut started = false;
        let result = ctx.run(async { started = true }).await;
        assert_eq!(result, Err(ContextError::Cancelled));
        assert!(!started);
    }

    #[tokio::test]
    async fn should_ignore_dropped_sender() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let ctx = RequestContext::background().with_cancellation(rx);
        assert_eq!(ctx.run(async { "done" }).await, Ok("done"));
    }

    #[test]
    fn should_keep_earliest_deadline() {
        let now = Instant::now();
        let early = now + Duration::from_secs(1);
        let late = now + Duration::from_secs(5);

        let ctx = RequestContext::background()
            .with_deadline(early)
            .with_deadline(late);
        assert_eq!(ctx.deadline(), Some(early));
    }
}
