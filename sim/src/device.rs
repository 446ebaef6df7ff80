// Copyright (c) 2024-2025 The dmk developers

//! Byte-level device model

use log::{debug, trace};

use dmk_apdu::{
    os::{DashboardInstruction, DeviceInstruction, CLA_DASHBOARD, CLA_DEVICE, DASHBOARD_NAME},
    Apdu, ApduResponse, StatusWord,
};

/// Applications listed per catalogue page
const APPS_PER_PAGE: usize = 2;

/// One installed application
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AppEntry {
    pub name: String,
    pub version: String,
    pub flags: u16,
}

impl AppEntry {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            flags: 0,
        }
    }
}

/// Initial state of a virtual device
#[derive(Clone, Debug)]
pub struct DeviceProfile {
    /// Human readable device name, log only
    pub name: String,
    pub os_version: String,
    pub mcu_version: String,
    pub bootloader_version: String,
    pub onboarded: bool,
    pub locked: bool,
    pub battery_percentage: u8,
    /// Installed application catalogue
    pub apps: Vec<AppEntry>,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            name: "Nano X 0001".to_string(),
            os_version: "1.6.0".to_string(),
            mcu_version: "4.03".to_string(),
            bootloader_version: "3.12".to_string(),
            onboarded: true,
            locked: false,
            battery_percentage: 100,
            apps: vec![
                AppEntry::new("Bitcoin", "2.1.0"),
                AppEntry::new("Ethereum", "1.10.4"),
            ],
        }
    }
}

/// A scripted secure element
///
/// Commands go in as serialized APDUs and responses come out as data plus
/// status trailer, exactly the payloads that travel inside frames. State
/// hooks let tests lock the device or script a consent refusal while a
/// flow is running.
pub struct VirtualDevice {
    profile: DeviceProfile,
    /// Index into the catalogue, dashboard when `None`
    current_app: Option<usize>,
    refuse_open: bool,
    list_cursor: usize,
    powered: bool,
}

impl VirtualDevice {
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            current_app: None,
            refuse_open: false,
            list_cursor: 0,
            powered: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn is_locked(&self) -> bool {
        self.profile.locked
    }

    /// Lock the device, every command answers the locked status from here
    pub fn lock(&mut self) {
        self.profile.locked = true;
    }

    pub fn unlock(&mut self) {
        self.profile.locked = false;
    }

    /// Refuse the next open-app request as if the user declined it
    pub fn refuse_next_open(&mut self) {
        self.refuse_open = true;
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Take the device off the wire, servers drop their links instead of
    /// answering
    pub fn power_off(&mut self) {
        self.powered = false;
    }

    /// Name of the frontmost application
    pub fn current_app(&self) -> &str {
        match self.current_app {
            Some(i) => &self.profile.apps[i].name,
            None => DASHBOARD_NAME,
        }
    }

    pub fn install(&mut self, app: AppEntry) {
        self.profile.apps.push(app);
    }

    /// Handle one serialized command APDU
    pub fn handle_apdu(&mut self, raw: &[u8]) -> Vec<u8> {
        let Ok(apdu) = Apdu::from_bytes(raw) else {
            return status_only(StatusWord::INCORRECT_DATA);
        };

        trace!(
            "device command {:02x} {:02x} p1={:02x} p2={:02x}",
            apdu.cla,
            apdu.ins,
            apdu.p1,
            apdu.p2
        );

        if self.profile.locked {
            return status_only(StatusWord::LOCKED);
        }

        match apdu.cla {
            CLA_DASHBOARD => self.handle_dashboard(&apdu),
            CLA_DEVICE => self.handle_device(&apdu),
            _ => status_only(StatusWord::CLA_NOT_SUPPORTED),
        }
    }

    fn handle_dashboard(&mut self, apdu: &Apdu) -> Vec<u8> {
        match DashboardInstruction::try_from(apdu.ins) {
            Ok(DashboardInstruction::GetAppAndVersion) => {
                let (name, version) = match self.current_app {
                    Some(i) => {
                        let app = &self.profile.apps[i];
                        (app.name.as_str(), app.version.as_str())
                    }
                    None => (DASHBOARD_NAME, self.profile.os_version.as_str()),
                };

                let mut data = vec![0x01];
                push_lv(&mut data, name.as_bytes());
                push_lv(&mut data, version.as_bytes());
                reply(StatusWord::OK, data)
            }
            Ok(DashboardInstruction::CloseApp) => {
                if let Some(i) = self.current_app.take() {
                    debug!("closing {}", self.profile.apps[i].name);
                }
                status_only(StatusWord::OK)
            }
            Err(_) => status_only(StatusWord::INS_NOT_SUPPORTED),
        }
    }

    fn handle_device(&mut self, apdu: &Apdu) -> Vec<u8> {
        match DeviceInstruction::try_from(apdu.ins) {
            Ok(DeviceInstruction::GetOsVersion) => self.os_version(),
            Ok(DeviceInstruction::GetBatteryStatus) => self.battery(apdu.p2),
            Ok(DeviceInstruction::OpenApp) => self.open_app(&apdu.data),
            Ok(DeviceInstruction::ListApps) => {
                self.list_cursor = 0;
                self.list_page()
            }
            Ok(DeviceInstruction::ListAppsContinue) => self.list_page(),
            Err(_) => status_only(StatusWord::INS_NOT_SUPPORTED),
        }
    }

    fn os_version(&self) -> Vec<u8> {
        // locked commands never get this far, the pin is always validated
        let mut se_flags = 0x82u8;
        if self.profile.onboarded {
            se_flags |= 0x04;
        }

        let mut data = vec![0x33, 0x20, 0x00, 0x04];
        push_lv(&mut data, self.profile.os_version.as_bytes());
        push_lv(&mut data, &[se_flags, 0x00, 0x00, 0x00]);
        push_lv(&mut data, self.profile.mcu_version.as_bytes());
        push_lv(&mut data, self.profile.bootloader_version.as_bytes());

        reply(StatusWord::OK, data)
    }

    fn battery(&self, selector: u8) -> Vec<u8> {
        let data = match selector {
            // percentage
            0x00 => vec![self.profile.battery_percentage],
            // millivolts
            0x01 => 4000u16.to_be_bytes().to_vec(),
            // degrees
            0x02 => vec![20],
            // milliamps, discharging
            0x03 => vec![0xf6],
            // charging + usb powered
            0x04 => vec![0x00, 0x00, 0x00, 0x03],
            _ => return status_only(StatusWord::INCORRECT_DATA),
        };

        reply(StatusWord::OK, data)
    }

    fn open_app(&mut self, data: &[u8]) -> Vec<u8> {
        if core::mem::take(&mut self.refuse_open) {
            debug!("open refused by script");
            return status_only(StatusWord::CONDITIONS_NOT_SATISFIED);
        }

        let Ok(name) = core::str::from_utf8(data) else {
            return status_only(StatusWord::INCORRECT_DATA);
        };

        match self.profile.apps.iter().position(|a| a.name == name) {
            Some(i) => {
                debug!("opening {name}");
                self.current_app = Some(i);
                status_only(StatusWord::OK)
            }
            None => status_only(StatusWord::INCORRECT_DATA),
        }
    }

    fn list_page(&mut self) -> Vec<u8> {
        let apps: Vec<_> = self
            .profile
            .apps
            .iter()
            .skip(self.list_cursor)
            .take(APPS_PER_PAGE)
            .collect();

        // an empty page terminates the enumeration
        if apps.is_empty() {
            return status_only(StatusWord::OK);
        }
        self.list_cursor += apps.len();

        let mut data = vec![0x01];
        for app in apps {
            data.push((2 + 32 + 32 + 1 + app.name.len()) as u8);
            data.extend_from_slice(&app.flags.to_be_bytes());
            data.extend_from_slice(&app_hash(&app.name, 0xaa));
            data.extend_from_slice(&app_hash(&app.name, 0xbb));
            push_lv(&mut data, app.name.as_bytes());
        }

        reply(StatusWord::OK, data)
    }
}

impl Default for VirtualDevice {
    fn default() -> Self {
        Self::new(DeviceProfile::default())
    }
}

fn push_lv(buf: &mut Vec<u8>, v: &[u8]) {
    buf.push(v.len() as u8);
    buf.extend_from_slice(v);
}

fn reply(status: StatusWord, data: Vec<u8>) -> Vec<u8> {
    ApduResponse::new(status, data).to_bytes()
}

fn status_only(status: StatusWord) -> Vec<u8> {
    status.to_bytes().to_vec()
}

/// Deterministic per-application filler hash
fn app_hash(name: &str, salt: u8) -> [u8; 32] {
    let mut h = [salt; 32];
    for (i, b) in name.bytes().enumerate().take(32) {
        h[i] ^= b;
    }
    h
}

#[cfg(test)]
mod test {
    use super::*;

    fn get_app_and_version() -> Vec<u8> {
        vec![0xb0, 0x01, 0x00, 0x00, 0x00]
    }

    fn open(name: &str) -> Vec<u8> {
        let mut apdu = vec![0xe0, 0xd8, 0x00, 0x00, name.len() as u8];
        apdu.extend_from_slice(name.as_bytes());
        apdu
    }

    fn status_of(response: &[u8]) -> u16 {
        let tail = &response[response.len() - 2..];
        u16::from_be_bytes([tail[0], tail[1]])
    }

    #[test]
    fn reports_the_dashboard_when_nothing_is_open() {
        let mut device = VirtualDevice::default();

        let response = device.handle_apdu(&get_app_and_version());

        assert_eq!(status_of(&response), 0x9000);
        // format, then LV name
        assert_eq!(response[0], 0x01);
        assert_eq!(&response[2..7], b"BOLOS");
        assert_eq!(device.current_app(), "BOLOS");
    }

    #[test]
    fn locked_device_rejects_everything() {
        let mut device = VirtualDevice::default();
        device.lock();

        assert_eq!(status_of(&device.handle_apdu(&get_app_and_version())), 0x5515);
        assert_eq!(status_of(&device.handle_apdu(&open("Bitcoin"))), 0x5515);

        device.unlock();
        assert_eq!(status_of(&device.handle_apdu(&get_app_and_version())), 0x9000);
    }

    #[test]
    fn opens_and_closes_applications() {
        let mut device = VirtualDevice::default();

        assert_eq!(status_of(&device.handle_apdu(&open("Bitcoin"))), 0x9000);
        assert_eq!(device.current_app(), "Bitcoin");

        let response = device.handle_apdu(&get_app_and_version());
        assert_eq!(&response[2..9], b"Bitcoin");

        // close returns to the dashboard
        let response = device.handle_apdu(&[0xb0, 0xa7, 0x00, 0x00, 0x00]);
        assert_eq!(status_of(&response), 0x9000);
        assert_eq!(device.current_app(), "BOLOS");
    }

    #[test]
    fn missing_apps_answer_incorrect_data() {
        let mut device = VirtualDevice::default();

        assert_eq!(status_of(&device.handle_apdu(&open("Vault"))), 0x6a81);
        assert_eq!(device.current_app(), "BOLOS");
    }

    #[test]
    fn scripted_refusal_fires_once() {
        let mut device = VirtualDevice::default();
        device.refuse_next_open();

        assert_eq!(status_of(&device.handle_apdu(&open("Bitcoin"))), 0x6985);
        assert_eq!(device.current_app(), "BOLOS");

        assert_eq!(status_of(&device.handle_apdu(&open("Bitcoin"))), 0x9000);
        assert_eq!(device.current_app(), "Bitcoin");
    }

    #[test]
    fn unknown_class_and_instruction() {
        let mut device = VirtualDevice::default();

        assert_eq!(
            status_of(&device.handle_apdu(&[0x80, 0x01, 0x00, 0x00, 0x00])),
            0x6e00
        );
        assert_eq!(
            status_of(&device.handle_apdu(&[0xe0, 0x77, 0x00, 0x00, 0x00])),
            0x6d00
        );
        assert_eq!(
            status_of(&device.handle_apdu(&[0xb0, 0x77, 0x00, 0x00, 0x00])),
            0x6d00
        );
    }

    #[test]
    fn truncated_commands_answer_incorrect_data() {
        let mut device = VirtualDevice::default();

        assert_eq!(status_of(&device.handle_apdu(&[0xe0, 0x01])), 0x6a81);
    }

    #[test]
    fn catalogue_pages_until_empty() {
        let mut device = VirtualDevice::default();
        device.install(AppEntry::new("Solana", "1.4.2"));

        let first = device.handle_apdu(&[0xe0, 0xde, 0x00, 0x00, 0x00]);
        assert_eq!(status_of(&first), 0x9000);
        assert_eq!(first[0], 0x01);

        let second = device.handle_apdu(&[0xe0, 0xdf, 0x00, 0x00, 0x00]);
        assert_eq!(status_of(&second), 0x9000);
        // one app left, block length + 2 byte status + format byte
        assert_eq!(second.len(), 1 + 1 + (2 + 32 + 32 + 1 + 6) + 2);

        let done = device.handle_apdu(&[0xe0, 0xdf, 0x00, 0x00, 0x00]);
        assert_eq!(done, vec![0x90, 0x00]);

        // a fresh first page resets the cursor
        let again = device.handle_apdu(&[0xe0, 0xde, 0x00, 0x00, 0x00]);
        assert_eq!(again, first);
    }

    #[test]
    fn battery_selectors() {
        let mut device = VirtualDevice::new(DeviceProfile {
            battery_percentage: 55,
            ..Default::default()
        });

        let response = device.handle_apdu(&[0xe0, 0x10, 0x00, 0x00, 0x00]);
        assert_eq!(response, vec![55, 0x90, 0x00]);

        let response = device.handle_apdu(&[0xe0, 0x10, 0x00, 0x01, 0x00]);
        assert_eq!(response, vec![0x0f, 0xa0, 0x90, 0x00]);

        let response = device.handle_apdu(&[0xe0, 0x10, 0x00, 0x09, 0x00]);
        assert_eq!(status_of(&response), 0x6a81);
    }

    #[test]
    fn os_version_reflects_onboarding() {
        let mut onboarded = VirtualDevice::default();
        let response = onboarded.handle_apdu(&[0xe0, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(status_of(&response), 0x9000);
        assert_eq!(&response[..4], &[0x33, 0x20, 0x00, 0x04]);
        // flags LV follows the version LV
        let flags_at = 4 + 1 + response[4] as usize + 1;
        assert_eq!(response[flags_at], 0x86);

        let mut fresh = VirtualDevice::new(DeviceProfile {
            onboarded: false,
            ..Default::default()
        });
        let response = fresh.handle_apdu(&[0xe0, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(response[flags_at], 0x82);
    }
}
