use futures::{stream::BoxStream, StreamExt};
use zbus::{MessageStream, MessageType};

use crate::{
    connection::decode_body,
    dbus::{self, NOTIFICATIONS_MEMBER},
    DockConnection, Error, Result, Value,
};

/// A desktop notification, as sent to the notification daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub sender: String,
    pub id: u32,
    pub icon: String,
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Read the arguments of a `Notify(app_name, replaces_id, icon, summary, body, actions, hints, timeout)` call.
    pub fn from_body(body: &[Value]) -> Result<Self> {
        if body.len() < 8 {
            return Err(Error::protocol(NOTIFICATIONS_MEMBER, format!("expected 8 arguments, got {}", body.len())));
        }
        Ok(Notification {
            sender: body[0].as_string()?,
            id: body[1].as_u32()?,
            icon: body[2].as_string()?,
            title: body[3].as_string()?,
            body: body[4].as_string()?,
        })
    }
}

impl DockConnection {
    /// Listen to the notifications other programs send.
    ///
    /// This relies on the bus allowing eavesdropping. When it refuses, the returned stream never yields.
    pub async fn notifications(&self) -> BoxStream<'static, Notification> {
        let stream = MessageStream::from(self.connection());
        if let Err(err) = self.add_match(&dbus::notifications_match_rule()).await {
            log::warn!("Could not eavesdrop on notifications, the history stays empty: {:?}", err);
            return futures::stream::pending().boxed();
        }
        stream
            .filter_map(|msg| {
                let notification = msg.map_err(Error::from).and_then(|msg| decode_notification(&msg));
                futures::future::ready(match notification {
                    Ok(notification) => notification,
                    Err(err) => {
                        log::warn!("Could not read notification: {:?}", err);
                        None
                    }
                })
            })
            .boxed()
    }
}

fn decode_notification(msg: &zbus::Message) -> Result<Option<Notification>> {
    let hdr = msg.header()?;
    if hdr.message_type()? != MessageType::MethodCall {
        return Ok(None);
    }
    let is_notify = hdr.member()?.map_or(false, |m| m.as_str() == NOTIFICATIONS_MEMBER)
        && hdr.path()?.map_or(false, |p| p.as_str() == dbus::NOTIFICATIONS_PATH);
    if !is_notify {
        return Ok(None);
    }
    Notification::from_body(&decode_body(msg)?).map(Some)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_body() {
        let body = vec![
            Value::from("mail"),
            Value::Uint(4),
            Value::from("mail-icon"),
            Value::from("New mail"),
            Value::from("3 unread"),
            Value::List(vec![]),
            Value::Map(Default::default()),
            Value::Int(-1),
        ];
        assert_eq!(
            Notification::from_body(&body).unwrap(),
            Notification {
                sender: "mail".to_string(),
                id: 4,
                icon: "mail-icon".to_string(),
                title: "New mail".to_string(),
                body: "3 unread".to_string(),
            }
        );
        assert!(Notification::from_body(&body[..5]).is_err());
    }
}
