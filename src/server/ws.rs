use crate::dispatch::World;
use crate::state::ConnId;
use crate::state::SessionId;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

/// Pumps one socket: outbound room events flow from the dispatch
/// layer's sink into the session, inbound frames become intents.
/// Either side closing tears the bridge down and reports a
/// disconnect, which starts the session grace window.
pub async fn bridge(
    world: Arc<World>,
    mut session: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
    resume: Option<SessionId>,
) {
    let conn = ConnId::default();
    let (tx, mut rx) = unbounded_channel::<String>();
    world.handle_connect(conn, resume, tx).await;
    'sesh: loop {
        tokio::select! {
            biased;
            outbound = rx.recv() => match outbound {
                Some(json) => if session.text(json).await.is_err() { break 'sesh },
                None => break 'sesh,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(actix_ws::Message::Text(text))) => {
                    world.handle_message(conn, &text).await;
                }
                Some(Ok(actix_ws::Message::Close(_))) => break 'sesh,
                Some(Ok(_)) => continue 'sesh,
                Some(Err(_)) => break 'sesh,
                None => break 'sesh,
            },
        }
    }
    world.handle_close(conn).await;
    let _ = session.close(None).await;
}
