//! Names and match rules of the dock's bus interface.

pub const DOCK_BUS_NAME: &str = "org.cairodock.CairoDock";
pub const DOCK_INTERFACE: &str = "org.cairodock.CairoDock";
pub const APPLET_INTERFACE: &str = "org.cairodock.CairoDock.applet";
pub const SUBAPPLET_INTERFACE: &str = "org.cairodock.CairoDock.subapplet";

pub const SUB_ICONS_SUFFIX: &str = "/sub_icons";

pub const NOTIFICATIONS_PATH: &str = "/org/freedesktop/Notifications";
pub const NOTIFICATIONS_MEMBER: &str = "Notify";

pub const BUS_DAEMON_NAME: &str = "org.freedesktop.DBus";
pub const BUS_DAEMON_PATH: &str = "/org/freedesktop/DBus";

pub fn sub_icons_path(bus_path: &str) -> String {
    format!("{}{}", bus_path, SUB_ICONS_SUFFIX)
}

/// Signals the dock emits for the main icon of the applet at `bus_path`.
pub fn applet_match_rule(bus_path: &str) -> String {
    signal_rule(bus_path, APPLET_INTERFACE)
}

/// Signals the dock emits for the sub-icons of the applet at `bus_path`.
pub fn subapplet_match_rule(bus_path: &str) -> String {
    signal_rule(&sub_icons_path(bus_path), SUBAPPLET_INTERFACE)
}

fn signal_rule(path: &str, interface: &str) -> String {
    format!("type='signal',path='{}',interface='{}',sender='{}'", path, interface, DOCK_BUS_NAME)
}

/// Method calls to the notification daemon, received through eavesdropping.
pub fn notifications_match_rule() -> String {
    format!("type='method_call',path='{}',member='{}',eavesdrop='true'", NOTIFICATIONS_PATH, NOTIFICATIONS_MEMBER)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_match_rules() {
        insta::assert_snapshot!(applet_match_rule("/org/cairodock/CairoDock/demo"), @"type='signal',path='/org/cairodock/CairoDock/demo',interface='org.cairodock.CairoDock.applet',sender='org.cairodock.CairoDock'");
        insta::assert_snapshot!(subapplet_match_rule("/org/cairodock/CairoDock/demo"), @"type='signal',path='/org/cairodock/CairoDock/demo/sub_icons',interface='org.cairodock.CairoDock.subapplet',sender='org.cairodock.CairoDock'");
        insta::assert_snapshot!(notifications_match_rule(), @"type='method_call',path='/org/freedesktop/Notifications',member='Notify',eavesdrop='true'");
    }
}
