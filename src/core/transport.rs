use crate::domain::message::{Reply, Request, Response};
use crate::utils::error::{Result, SyncError};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub struct Envelope {
    pub request: Request,
    reply_to: oneshot::Sender<Reply>,
}

impl Envelope {
    pub fn respond(self, reply: Reply) -> bool {
        self.reply_to.send(reply).is_ok()
    }
}

/// 頁面端送出請求的一端。同一通道內的訊息依送出順序處理
#[derive(Debug, Clone)]
pub struct Transport {
    sender: mpsc::UnboundedSender<Envelope>,
}

#[derive(Debug)]
pub struct RequestReceiver {
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

pub fn channel() -> (Transport, RequestReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Transport { sender }, RequestReceiver { receiver })
}

impl RequestReceiver {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }

    pub fn close(&mut self) {
        self.receiver.close();
    }
}

/// 等待中的回覆。回覆端消失時以 `ChannelClosed` 結束，不會永遠等待
#[derive(Debug)]
pub struct PendingReply {
    kind: &'static str,
    receiver: oneshot::Receiver<Reply>,
}

impl PendingReply {
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub async fn wait(self) -> Result<Response> {
        match self.receiver.await {
            Ok(reply) => reply.into_result(),
            Err(_) => {
                tracing::debug!(kind = self.kind, "reply channel dropped");
                Err(SyncError::ChannelClosed)
            }
        }
    }
}

impl Transport {
    pub fn send(&self, request: Request) -> Result<PendingReply> {
        let kind = request.kind();
        let (reply_to, receiver) = oneshot::channel();
        self.sender
            .send(Envelope { request, reply_to })
            .map_err(|_| SyncError::ChannelClosed)?;
        tracing::debug!(kind, "request sent");
        Ok(PendingReply { kind, receiver })
    }

    pub async fn request(&self, request: Request) -> Result<Response> {
        self.send(request)?.wait().await
    }

    /// 送出後不等待；回覆（或失敗）交給 `on_reply` 處理
    pub fn send_then<F>(&self, request: Request, on_reply: F)
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        let pending = match self.send(request) {
            Ok(pending) => pending,
            Err(e) => {
                on_reply(Err(e));
                return;
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    on_reply(pending.wait().await);
                });
            }
            Err(_) => {
                tracing::warn!(
                    kind = pending.kind(),
                    "no async runtime available, reply will not be observed"
                );
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CommuteAddress;

    #[tokio::test]
    async fn test_request_receives_exactly_one_reply() {
        let (transport, mut receiver) = channel();

        let responder = tokio::spawn(async move {
            let envelope = receiver.recv().await.unwrap();
            assert_eq!(envelope.request, Request::FetchAddresses);
            envelope.respond(Reply::ok(Response::Addresses {
                addresses: vec![CommuteAddress::new("a", "Damrak 1")],
            }))
        });

        let response = transport.request(Request::FetchAddresses).await.unwrap();
        assert!(responder.await.unwrap());
        assert_eq!(response.kind(), "ADDRESSES");
    }

    #[tokio::test]
    async fn test_dropped_envelope_rejects_with_channel_closed() {
        let (transport, mut receiver) = channel();

        tokio::spawn(async move {
            // Receive and drop without answering
            let _ = receiver.recv().await;
        });

        let result = transport.request(Request::ClearAll).await;
        assert!(matches!(result, Err(SyncError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_send_on_closed_channel_fails_immediately() {
        let (transport, receiver) = channel();
        drop(receiver);

        assert!(transport.is_closed());
        assert!(matches!(
            transport.send(Request::FetchMaxDurations),
            Err(SyncError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_error_reply_is_surfaced() {
        let (transport, mut receiver) = channel();

        tokio::spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                envelope.respond(Reply::err("storage unavailable"));
            }
        });

        let (tx, rx) = oneshot::channel();
        transport.send_then(Request::FetchAddresses, move |result| {
            let _ = tx.send(result);
        });

        match rx.await.unwrap() {
            Err(SyncError::RemoteError { message }) => assert_eq!(message, "storage unavailable"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_messages_arrive_in_send_order() {
        let (transport, mut receiver) = channel();

        let _first = transport.send(Request::FetchAddresses).unwrap();
        let _second = transport.send(Request::ClearAll).unwrap();
        let _third = transport.send(Request::FetchMaxDurations).unwrap();

        let mut kinds = Vec::new();
        for _ in 0..3 {
            kinds.push(receiver.recv().await.unwrap().request.kind());
        }
        assert_eq!(kinds, vec!["FETCH_ADDRESSES", "CLEAR_ALL", "FETCH_MAX_DURATIONS"]);
    }
}
