use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use zbus::{zvariant, MessageStream, MessageType};

use crate::{
    dbus::{self, APPLET_INTERFACE, DOCK_BUS_NAME, SUBAPPLET_INTERFACE},
    DockBus, Result, Signal, Target, Value,
};

/// Connection to the dock on the session bus, bound to one applet's object path.
#[derive(Debug, Clone)]
pub struct DockConnection {
    con: zbus::Connection,
    bus_path: String,
}

impl DockConnection {
    pub async fn connect(bus_path: &str) -> Result<Self> {
        let con = zbus::Connection::session().await?;
        log::debug!("Connected to the session bus as {:?}", con.unique_name());
        Ok(DockConnection { con, bus_path: bus_path.to_string() })
    }

    pub fn bus_path(&self) -> &str {
        &self.bus_path
    }

    pub fn connection(&self) -> &zbus::Connection {
        &self.con
    }

    fn address(&self, target: Target) -> (String, &'static str) {
        match target {
            Target::Icon => (self.bus_path.clone(), APPLET_INTERFACE),
            Target::SubIcons => (dbus::sub_icons_path(&self.bus_path), SUBAPPLET_INTERFACE),
        }
    }

    pub(crate) async fn add_match(&self, rule: &str) -> Result<()> {
        self.con
            .call_method(Some(dbus::BUS_DAEMON_NAME), dbus::BUS_DAEMON_PATH, Some(dbus::BUS_DAEMON_NAME), "AddMatch", &(rule,))
            .await?;
        Ok(())
    }

    /// Subscribe to the signals of the main icon and the sub-icons.
    ///
    /// Signals with a body that can't be read are logged and skipped. The stream ends when the connection is lost.
    pub async fn signals(&self) -> Result<BoxStream<'static, Signal>> {
        let stream = MessageStream::from(&self.con);
        self.add_match(&dbus::applet_match_rule(&self.bus_path)).await?;
        self.add_match(&dbus::subapplet_match_rule(&self.bus_path)).await?;

        let main_path = self.bus_path.clone();
        let sub_path = dbus::sub_icons_path(&self.bus_path);
        Ok(stream
            .filter_map(move |msg| {
                let result = match msg {
                    Ok(msg) => match decode_signal(&msg) {
                        Ok(Some(signal)) if signal.path == main_path || signal.path == sub_path => Some(signal),
                        Ok(_) => None,
                        Err(err) => {
                            log::warn!("Could not read signal: {:?}", err);
                            None
                        }
                    },
                    Err(err) => {
                        log::warn!("Error on the bus stream: {:?}", err);
                        None
                    }
                };
                futures::future::ready(result)
            })
            .boxed())
    }
}

fn decode_signal(msg: &zbus::Message) -> Result<Option<Signal>> {
    let hdr = msg.header()?;
    if hdr.message_type()? != MessageType::Signal {
        return Ok(None);
    }
    let (Some(interface), Some(member), Some(path)) = (hdr.interface()?, hdr.member()?, hdr.path()?) else {
        return Ok(None);
    };
    if interface.as_str() != APPLET_INTERFACE && interface.as_str() != SUBAPPLET_INTERFACE {
        return Ok(None);
    }
    Ok(Some(Signal {
        interface: interface.to_string(),
        member: member.to_string(),
        path: path.to_string(),
        body: decode_body(msg)?,
    }))
}

/// Read the positional arguments of a message. A message without body yields no values.
pub(crate) fn decode_body(msg: &zbus::Message) -> Result<Vec<Value>> {
    match msg.body_signature() {
        Ok(signature) if !signature.as_str().is_empty() => {
            let body: zvariant::Structure = msg.body()?;
            Ok(body.fields().iter().map(Value::from).collect())
        }
        _ => Ok(Vec::new()),
    }
}

fn encode_body(args: Vec<Value>) -> Result<Option<zvariant::Structure<'static>>> {
    if args.is_empty() {
        return Ok(None);
    }
    let mut builder = zvariant::StructureBuilder::new();
    for arg in args {
        builder = builder.append_field(zvariant::Value::try_from(arg)?);
    }
    Ok(Some(builder.build()))
}

#[async_trait]
impl DockBus for DockConnection {
    async fn call(&self, target: Target, method: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        let (path, interface) = self.address(target);
        let reply = match encode_body(args)? {
            Some(body) => self.con.call_method(Some(DOCK_BUS_NAME), path.as_str(), Some(interface), method, &body).await?,
            None => self.con.call_method(Some(DOCK_BUS_NAME), path.as_str(), Some(interface), method, &()).await?,
        };
        decode_body(&reply)
    }

    async fn send(&self, target: Target, method: &str, args: Vec<Value>) -> Result<()> {
        let body = encode_body(args)?;
        let (path, interface) = self.address(target);
        let con = self.con.clone();
        let method = method.to_string();
        tokio::spawn(async move {
            let result = match body {
                Some(body) => con.call_method(Some(DOCK_BUS_NAME), path.as_str(), Some(interface), method.as_str(), &body).await,
                None => con.call_method(Some(DOCK_BUS_NAME), path.as_str(), Some(interface), method.as_str(), &()).await,
            };
            if let Err(err) = result {
                log::warn!("Could not send {} to the dock: {:?}", method, err);
            }
        });
        Ok(())
    }
}
