//! Well-known service, object and interface names on the BMC bus.

pub const NETWORK_SERVICE: &str = "xyz.openbmc_project.Network";
pub const NETWORK_ROOT: &str = "/xyz/openbmc_project/network";
pub const NETWORK_CONFIG_PATH: &str = "/xyz/openbmc_project/network/config";
pub const DHCP_CONFIG_PATH: &str = "/xyz/openbmc_project/network/config/dhcp";

pub const ETHERNET_INTERFACE: &str = "xyz.openbmc_project.Network.EthernetInterface";
pub const MAC_ADDRESS_INTERFACE: &str = "xyz.openbmc_project.Network.MACAddress";
pub const VLAN_INTERFACE: &str = "xyz.openbmc_project.Network.VLAN";
pub const VLAN_CREATE_INTERFACE: &str = "xyz.openbmc_project.Network.VLAN.Create";
pub const IP_INTERFACE: &str = "xyz.openbmc_project.Network.IP";
pub const IP_CREATE_INTERFACE: &str = "xyz.openbmc_project.Network.IP.Create";
pub const SYSTEM_CONFIGURATION_INTERFACE: &str = "xyz.openbmc_project.Network.SystemConfiguration";
pub const DHCP_CONFIGURATION_INTERFACE: &str = "xyz.openbmc_project.Network.DHCPConfiguration";

pub const IPV4_PROTOCOL: &str = "xyz.openbmc_project.Network.IP.Protocol.IPv4";
pub const IPV6_PROTOCOL: &str = "xyz.openbmc_project.Network.IP.Protocol.IPv6";

pub const ORIGIN_STATIC: &str = "xyz.openbmc_project.Network.IP.AddressOrigin.Static";
pub const ORIGIN_LINK_LOCAL: &str = "xyz.openbmc_project.Network.IP.AddressOrigin.LinkLocal";
pub const ORIGIN_DHCP: &str = "xyz.openbmc_project.Network.IP.AddressOrigin.DHCP";
pub const ORIGIN_SLAAC: &str = "xyz.openbmc_project.Network.IP.AddressOrigin.SLAAC";

pub const HOST_SERVICE: &str = "xyz.openbmc_project.State.Host";
pub const HOST_PATH: &str = "/xyz/openbmc_project/state/host0";
pub const HOST_INTERFACE: &str = "xyz.openbmc_project.State.Host";
pub const HOST_RUNNING: &str = "xyz.openbmc_project.State.Host.HostState.Running";
pub const HOST_OFF: &str = "xyz.openbmc_project.State.Host.HostState.Off";

pub const CHASSIS_SERVICE: &str = "xyz.openbmc_project.State.Chassis";
pub const CHASSIS_PATH: &str = "/xyz/openbmc_project/state/chassis0";
pub const CHASSIS_INTERFACE: &str = "xyz.openbmc_project.State.Chassis";

pub const NMI_SERVICE: &str = "xyz.openbmc_project.Control.Host.NMI";
pub const NMI_PATH: &str = "/xyz/openbmc_project/control/host0/nmi";
pub const NMI_INTERFACE: &str = "xyz.openbmc_project.Control.Host.NMI";

pub const LED_GROUP_SERVICE: &str = "xyz.openbmc_project.LED.GroupManager";
pub const LED_GROUPS_ROOT: &str = "/xyz/openbmc_project/led/groups";
pub const LED_IDENTIFY_GROUP_PATH: &str = "/xyz/openbmc_project/led/groups/enclosure_identify";
pub const LED_GROUP_INTERFACE: &str = "xyz.openbmc_project.Led.Group";
pub const LED_CONTROLLER_SERVICE: &str = "xyz.openbmc_project.LED.Controller.identify";
pub const LED_IDENTIFY_PATH: &str = "/xyz/openbmc_project/led/physical/identify";
pub const LED_PHYSICAL_INTERFACE: &str = "xyz.openbmc_project.Led.Physical";
pub const LED_ACTION_ON: &str = "xyz.openbmc_project.Led.Physical.Action.On";
pub const LED_ACTION_BLINK: &str = "xyz.openbmc_project.Led.Physical.Action.Blink";
pub const LED_ACTION_OFF: &str = "xyz.openbmc_project.Led.Physical.Action.Off";

pub const INVENTORY_SERVICE: &str = "xyz.openbmc_project.Inventory.Manager";
pub const INVENTORY_SYSTEM_PATH: &str = "/xyz/openbmc_project/inventory/system";
pub const ASSET_INTERFACE: &str = "xyz.openbmc_project.Inventory.Decorator.Asset";
pub const ASSET_TAG_INTERFACE: &str = "xyz.openbmc_project.Inventory.Decorator.AssetTag";
pub const INVENTORY_ROOT: &str = "/xyz/openbmc_project/inventory";
pub const CHASSIS_INVENTORY_PATH: &str = "/xyz/openbmc_project/inventory/system/chassis";
pub const ITEM_INTERFACE: &str = "xyz.openbmc_project.Inventory.Item";
pub const ITEM_SYSTEM_INTERFACE: &str = "xyz.openbmc_project.Inventory.Item.System";
pub const ITEM_CHASSIS_INTERFACE: &str = "xyz.openbmc_project.Inventory.Item.Chassis";
pub const ITEM_BOARD_INTERFACE: &str = "xyz.openbmc_project.Inventory.Item.Board";
pub const ITEM_CPU_INTERFACE: &str = "xyz.openbmc_project.Inventory.Item.Cpu";
pub const ITEM_DIMM_INTERFACE: &str = "xyz.openbmc_project.Inventory.Item.Dimm";
pub const ITEM_POWER_SUPPLY_INTERFACE: &str = "xyz.openbmc_project.Inventory.Item.PowerSupply";
pub const OPERATIONAL_STATUS_INTERFACE: &str = "xyz.openbmc_project.State.Decorator.OperationalStatus";
pub const UUID_INTERFACE: &str = "xyz.openbmc_project.Common.UUID";
pub const ASSOCIATION_INTERFACE: &str = "xyz.openbmc_project.Association";

pub const SETTINGS_SERVICE: &str = "xyz.openbmc_project.Settings";
pub const BOOT_PATH: &str = "/xyz/openbmc_project/control/host0/boot";
pub const BOOT_ONE_TIME_PATH: &str = "/xyz/openbmc_project/control/host0/boot/one_time";
pub const BOOT_SOURCE_INTERFACE: &str = "xyz.openbmc_project.Control.Boot.Source";
pub const BOOT_MODE_INTERFACE: &str = "xyz.openbmc_project.Control.Boot.Mode";
pub const ENABLE_INTERFACE: &str = "xyz.openbmc_project.Object.Enable";
pub const BOOT_SOURCE_DEFAULT: &str = "xyz.openbmc_project.Control.Boot.Source.Sources.Default";
pub const BOOT_MODE_REGULAR: &str = "xyz.openbmc_project.Control.Boot.Mode.Modes.Regular";

pub const SENSORS_ROOT: &str = "/xyz/openbmc_project/sensors";
pub const SENSOR_VALUE_INTERFACE: &str = "xyz.openbmc_project.Sensor.Value";
pub const SENSOR_WARNING_INTERFACE: &str = "xyz.openbmc_project.Sensor.Threshold.Warning";
pub const SENSOR_CRITICAL_INTERFACE: &str = "xyz.openbmc_project.Sensor.Threshold.Critical";

pub const CONTROL_ROOT: &str = "/xyz/openbmc_project/control";
pub const FAN_REDUNDANCY_INTERFACE: &str = "xyz.openbmc_project.Control.FanRedundancy";
