use std::collections::BTreeMap;

use dockbus::{Error, Result, Value};

use crate::icon::Icon;

/// A property of the icon the dock can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
pub enum IconProperty {
    #[strum(serialize = "x")]
    X,
    #[strum(serialize = "y")]
    Y,
    #[strum(serialize = "width")]
    Width,
    #[strum(serialize = "height")]
    Height,
    /// Position of the container on the screen.
    #[strum(serialize = "orientation")]
    Orientation,
    /// Kind of container holding the icon.
    #[strum(serialize = "container")]
    Container,
    /// Window id of the application the icon controls.
    #[strum(serialize = "Xid")]
    Xid,
    #[strum(serialize = "has_focus")]
    HasFocus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconProperties {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub orientation: u32,
    /// Shifted by one so that 0 means the dock didn't say.
    pub container: u32,
    pub xid: u64,
    pub has_focus: bool,
}

impl IconProperties {
    fn from_map(map: &BTreeMap<String, Value>) -> Result<Self> {
        let mut props = IconProperties::default();
        for (key, value) in map {
            match key.parse::<IconProperty>() {
                Ok(IconProperty::X) => props.x = value.as_i32()?,
                Ok(IconProperty::Y) => props.y = value.as_i32()?,
                Ok(IconProperty::Width) => props.width = value.as_i32()?,
                Ok(IconProperty::Height) => props.height = value.as_i32()?,
                Ok(IconProperty::Orientation) => props.orientation = value.as_u32()?,
                Ok(IconProperty::Container) => props.container = value.as_u32()?.saturating_add(1),
                Ok(IconProperty::Xid) => props.xid = value.as_u64()?,
                Ok(IconProperty::HasFocus) => props.has_focus = value.as_bool()?,
                Err(_) => log::debug!("Ignoring unknown icon property {}", key),
            }
        }
        Ok(props)
    }
}

impl Icon {
    /// Ask the dock for one property of the icon.
    pub async fn get_property(&self, property: IconProperty) -> Result<Value> {
        let reply = self.call("Get", vec![property.as_ref().into()]).await?;
        let value = reply.into_iter().next().ok_or_else(|| Error::protocol("Get", "empty reply"))?;
        Ok(match property {
            IconProperty::Container => Value::Uint(value.as_u64()?.saturating_add(1)),
            _ => value,
        })
    }

    pub async fn get_properties(&self) -> Result<IconProperties> {
        let reply = self.call("GetAll", vec![]).await?;
        let map = reply.first().ok_or_else(|| Error::protocol("GetAll", "empty reply"))?.as_map()?;
        IconProperties::from_map(map)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::icon::test::recording_icon;
    use maplit::btreemap;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_get_all_properties() {
        let (bus, icon) = recording_icon();
        bus.reply_with(
            "GetAll",
            vec![Value::Map(btreemap! {
                "x".to_string() => Value::Int(10),
                "width".to_string() => Value::Int(48),
                "container".to_string() => Value::Uint(0),
                "Xid".to_string() => Value::Uint(1234),
                "has_focus".to_string() => Value::Bool(true),
                "extra".to_string() => Value::from("ignored"),
            })],
        );
        let props = icon.get_properties().await.unwrap();
        assert_eq!(props, IconProperties { x: 10, width: 48, container: 1, xid: 1234, has_focus: true, ..Default::default() });
    }

    #[tokio::test]
    async fn test_get_single_property() {
        let (bus, icon) = recording_icon();
        bus.reply_with("Get", vec![Value::Uint(2)]);
        assert_eq!(icon.get_property(IconProperty::Container).await.unwrap(), Value::Uint(3));
        assert_eq!(bus.calls()[0].args, vec![Value::from("container")]);

        bus.reply_with("Get", vec![]);
        assert!(icon.get_property(IconProperty::Xid).await.is_err());
    }
}
