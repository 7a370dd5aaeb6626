// Only the fields we consume are modelled, ARM returns a lot more than this.

use serde::Deserialize;

/// A page of results from an ARM list operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    pub next_link: Option<String>,
}

/// A reference to another ARM resource by id.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SubResource {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub name: String,
    #[serde(default)]
    pub properties: VirtualMachineProperties,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    pub network_profile: Option<NetworkProfile>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterfaceReference>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NetworkInterfaceReference {
    pub id: String,
    #[serde(default)]
    pub properties: PrimaryFlag,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PrimaryFlag {
    pub primary: Option<bool>,
}

impl VirtualMachine {
    /// The NIC flagged as primary, falling back to the first attached NIC since
    /// single NIC machines often omit the flag entirely.
    pub fn primary_network_interface(&self) -> Option<&NetworkInterfaceReference> {
        let nics = &self.properties.network_profile.as_ref()?.network_interfaces;

        nics.iter()
            .find(|nic| nic.properties.primary == Some(true))
            .or_else(|| nics.first())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: String,
    #[serde(default)]
    pub properties: NetworkInterfaceProperties,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceProperties {
    #[serde(default)]
    pub ip_configurations: Vec<IpConfiguration>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IpConfiguration {
    pub name: String,
    #[serde(default)]
    pub properties: IpConfigurationProperties,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfigurationProperties {
    pub primary: Option<bool>,
    #[serde(rename = "publicIPAddress")]
    pub public_ip_address: Option<SubResource>,
}

impl NetworkInterface {
    /// The public IP attached to the primary IP configuration, if there is one.
    pub fn primary_public_ip(&self) -> Option<&SubResource> {
        let configurations = &self.properties.ip_configurations;

        configurations
            .iter()
            .find(|config| config.properties.primary == Some(true))
            .or_else(|| configurations.first())?
            .properties
            .public_ip_address
            .as_ref()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PublicIpAddress {
    pub name: String,
    #[serde(default)]
    pub properties: PublicIpAddressProperties,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressProperties {
    // Dynamic addresses are only allocated once the attached VM is running
    pub ip_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{NetworkInterface, Page, PublicIpAddress, VirtualMachine};

    #[test]
    fn parses_virtual_machine_page() {
        let body = r#"{
            "value": [
                {
                    "name": "DC01",
                    "id": "/subscriptions/0000/resourceGroups/attack-range-rg/providers/Microsoft.Compute/virtualMachines/DC01",
                    "location": "westeurope",
                    "properties": {
                        "vmId": "6f0a0c1e",
                        "networkProfile": {
                            "networkInterfaces": [
                                { "id": "/subscriptions/0000/resourceGroups/attack-range-rg/providers/Microsoft.Network/networkInterfaces/dc01-secondary", "properties": { "primary": false } },
                                { "id": "/subscriptions/0000/resourceGroups/attack-range-rg/providers/Microsoft.Network/networkInterfaces/dc01-nic", "properties": { "primary": true } }
                            ]
                        }
                    }
                },
                { "name": "bare", "properties": {} }
            ],
            "nextLink": "https://management.azure.com/next-page"
        }"#;

        let page: Page<VirtualMachine> = serde_json::from_str(body).unwrap();

        assert_eq!(page.value.len(), 2);
        assert_eq!(
            page.next_link.as_deref(),
            Some("https://management.azure.com/next-page")
        );

        let primary = page.value[0].primary_network_interface().unwrap();
        assert!(primary.id.ends_with("/dc01-nic"));

        assert!(page.value[1].primary_network_interface().is_none());
    }

    #[test]
    fn first_nic_is_used_when_none_is_flagged_primary() {
        let vm: VirtualMachine = serde_json::from_str(
            r#"{
                "name": "kali",
                "properties": {
                    "networkProfile": {
                        "networkInterfaces": [ { "id": "/a/networkInterfaces/kali-nic" } ]
                    }
                }
            }"#,
        )
        .unwrap();

        assert!(vm
            .primary_network_interface()
            .unwrap()
            .id
            .ends_with("/kali-nic"));
    }

    #[test]
    fn nic_without_public_ip_has_no_primary_public_ip() {
        let nic: NetworkInterface = serde_json::from_str(
            r#"{
                "name": "internal-nic",
                "properties": {
                    "ipConfigurations": [
                        { "name": "ipconfig1", "properties": { "privateIPAddress": "10.0.1.4" } }
                    ]
                }
            }"#,
        )
        .unwrap();

        assert!(nic.primary_public_ip().is_none());
    }

    #[test]
    fn parses_public_ip_address() {
        let pip: PublicIpAddress = serde_json::from_str(
            r#"{ "name": "dc01-pip", "properties": { "ipAddress": "20.1.2.3", "publicIPAllocationMethod": "Static" } }"#,
        )
        .unwrap();

        assert_eq!(pip.properties.ip_address.as_deref(), Some("20.1.2.3"));
    }

    #[test]
    fn empty_page_has_no_values() {
        let page: Page<VirtualMachine> = serde_json::from_str("{}").unwrap();

        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }
}
