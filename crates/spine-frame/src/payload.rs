//! Fixed-layout payload structs.
//!
//! Each payload is packed little-endian with a fixed wire size. [`Codec`]
//! converts between the typed struct and its bytes and rejects buffers of
//! any other length.

use bytes::{Buf, BufMut};
use serde::Serialize;

use crate::error::CodecError;

pub const MOTOR_COUNT: usize = 4;
pub const CLIFF_COUNT: usize = 4;
pub const TOUCH_COUNT: usize = 2;
pub const MIC_COUNT: usize = 2;
pub const LED_BYTES: usize = 12;
pub const AUDIO_SAMPLES: usize = 320;
pub const CONTACT_DATA_LEN: usize = 32;
pub const DFU_WORDS: usize = 256;
pub const VERSION_FIELD_LEN: usize = 16;

/// `HeadToBody::power_flags` bit requesting calm mode.
pub const POWER_CALM_MODE: u8 = 0x01;

/// `BodyToHead::flags` bit set while the body streams full sensor data.
pub const RUNNING_FLAGS_SENSORS_VALID: u16 = 0x0001;

/// Index of the physical button in `BodyToHead::touch_level`.
pub const TOUCH_BUTTON_INDEX: usize = 1;

/// A payload with a fixed little-endian wire layout.
pub trait Codec: Sized {
    /// Exact encoded size in bytes.
    const WIRE_LEN: usize;

    /// Write the fields in wire order. `dst` must have `WIRE_LEN` bytes left.
    fn put<B: BufMut>(&self, dst: &mut B);

    /// Read the fields in wire order. `src` must have `WIRE_LEN` bytes left.
    fn get<B: Buf>(src: &mut B) -> Self;

    /// Encode into a buffer of exactly `WIRE_LEN` bytes.
    fn encode(&self, dst: &mut [u8]) -> Result<(), CodecError> {
        check_len(Self::WIRE_LEN, dst.len())?;
        let mut cursor = dst;
        self.put(&mut cursor);
        Ok(())
    }

    /// Decode from a buffer of exactly `WIRE_LEN` bytes.
    fn decode(src: &[u8]) -> Result<Self, CodecError> {
        check_len(Self::WIRE_LEN, src.len())?;
        let mut cursor = src;
        Ok(Self::get(&mut cursor))
    }

    fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::WIRE_LEN);
        self.put(&mut out);
        out
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), CodecError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CodecError::Length { expected, actual })
    }
}

fn get_array<B: Buf, const N: usize>(src: &mut B) -> [u8; N] {
    let mut out = [0u8; N];
    src.copy_to_slice(&mut out);
    out
}

/// Actuator data sent to the body every active tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeadToBody {
    pub framecounter: u32,
    pub power_flags: u8,
    /// Signed motor drive, one per motor.
    pub motor_power: [i16; MOTOR_COUNT],
    /// RGB triplets for the four backpack LEDs.
    pub led_colors: [u8; LED_BYTES],
}

impl HeadToBody {
    pub fn calm_requested(&self) -> bool {
        self.power_flags & POWER_CALM_MODE != 0
    }

    pub fn set_calm_requested(&mut self, calm: bool) {
        if calm {
            self.power_flags |= POWER_CALM_MODE;
        } else {
            self.power_flags &= !POWER_CALM_MODE;
        }
    }
}

impl Codec for HeadToBody {
    const WIRE_LEN: usize = 4 + 1 + 3 + 2 * MOTOR_COUNT + LED_BYTES;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.framecounter);
        dst.put_u8(self.power_flags);
        dst.put_bytes(0, 3);
        for power in self.motor_power {
            dst.put_i16_le(power);
        }
        dst.put_slice(&self.led_colors);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        let framecounter = src.get_u32_le();
        let power_flags = src.get_u8();
        src.advance(3);
        let motor_power = std::array::from_fn(|_| src.get_i16_le());
        let led_colors = get_array(src);
        Self {
            framecounter,
            power_flags,
            motor_power,
            led_colors,
        }
    }
}

/// Encoder state for one motor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MotorState {
    pub position: i32,
    pub delta: i32,
    pub time: u32,
}

impl Codec for MotorState {
    const WIRE_LEN: usize = 12;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_i32_le(self.position);
        dst.put_i32_le(self.delta);
        dst.put_u32_le(self.time);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        Self {
            position: src.get_i32_le(),
            delta: src.get_i32_le(),
            time: src.get_u32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatteryState {
    pub main_voltage: i16,
    pub charger: i16,
    pub temperature: i16,
    pub flags: u16,
}

impl Codec for BatteryState {
    const WIRE_LEN: usize = 8;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_i16_le(self.main_voltage);
        dst.put_i16_le(self.charger);
        dst.put_i16_le(self.temperature);
        dst.put_u16_le(self.flags);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        Self {
            main_voltage: src.get_i16_le(),
            charger: src.get_i16_le(),
            temperature: src.get_i16_le(),
            flags: src.get_u16_le(),
        }
    }
}

/// Time-of-flight proximity reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProxSensor {
    pub range_mm: u16,
    pub spad_count: u16,
    pub signal_rate: u16,
    pub ambient_rate: u16,
    pub sample_count: u8,
    /// Zero for a valid reading, otherwise the sensor's rejection reason.
    pub range_status: u8,
}

impl ProxSensor {
    /// Signal rate in mega-counts per second (Q9.7 on the wire).
    pub fn signal_rate_mcps(&self) -> f32 {
        f32::from(self.signal_rate) / 128.0
    }

    /// Ambient rate in mega-counts per second (Q9.7 on the wire).
    pub fn ambient_rate_mcps(&self) -> f32 {
        f32::from(self.ambient_rate) / 128.0
    }

    /// Effective SPAD count (Q8.8 on the wire).
    pub fn effective_spads(&self) -> f32 {
        f32::from(self.spad_count) / 256.0
    }
}

impl Codec for ProxSensor {
    const WIRE_LEN: usize = 12;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_u16_le(self.range_mm);
        dst.put_u16_le(self.spad_count);
        dst.put_u16_le(self.signal_rate);
        dst.put_u16_le(self.ambient_rate);
        dst.put_u8(self.sample_count);
        dst.put_u8(self.range_status);
        dst.put_u16_le(0);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        let prox = Self {
            range_mm: src.get_u16_le(),
            spad_count: src.get_u16_le(),
            signal_rate: src.get_u16_le(),
            ambient_rate: src.get_u16_le(),
            sample_count: src.get_u8(),
            range_status: src.get_u8(),
        };
        src.advance(2);
        prox
    }
}

/// Sensor snapshot streamed by the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyToHead {
    pub framecounter: u32,
    pub flags: u16,
    /// Non-zero when the body firmware has latched a fault.
    pub fail_code: u16,
    pub motors: [MotorState; MOTOR_COUNT],
    pub cliff_sense: [u16; CLIFF_COUNT],
    pub battery: BatteryState,
    pub proximity: ProxSensor,
    pub touch_level: [u16; TOUCH_COUNT],
    /// Stuck-bit masks per microphone channel pair.
    pub mic_error: [u16; MIC_COUNT],
    #[serde(skip)]
    pub audio: [i16; AUDIO_SAMPLES],
}

impl Default for BodyToHead {
    fn default() -> Self {
        Self {
            framecounter: 0,
            flags: 0,
            fail_code: 0,
            motors: [MotorState::default(); MOTOR_COUNT],
            cliff_sense: [0; CLIFF_COUNT],
            battery: BatteryState::default(),
            proximity: ProxSensor::default(),
            touch_level: [0; TOUCH_COUNT],
            mic_error: [0; MIC_COUNT],
            audio: [0; AUDIO_SAMPLES],
        }
    }
}

impl BodyToHead {
    /// True when the body is in active mode and every sensor field is live.
    pub fn sensors_valid(&self) -> bool {
        self.flags & RUNNING_FLAGS_SENSORS_VALID != 0
    }

    /// Build a placeholder snapshot from a bootloader frame.
    ///
    /// Only the button reading is real. Every other field is zero and must
    /// not be interpreted.
    pub fn from_boot_frame(boot: &BootFrame) -> Self {
        let mut data = Self::default();
        data.touch_level[TOUCH_BUTTON_INDEX] = if boot.button_pressed { u16::MAX } else { 0 };
        data
    }
}

impl Codec for BodyToHead {
    const WIRE_LEN: usize = 4
        + 2
        + 2
        + MotorState::WIRE_LEN * MOTOR_COUNT
        + 2 * CLIFF_COUNT
        + BatteryState::WIRE_LEN
        + ProxSensor::WIRE_LEN
        + 2 * TOUCH_COUNT
        + 2 * MIC_COUNT
        + 2 * AUDIO_SAMPLES;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.framecounter);
        dst.put_u16_le(self.flags);
        dst.put_u16_le(self.fail_code);
        for motor in &self.motors {
            motor.put(dst);
        }
        for cliff in self.cliff_sense {
            dst.put_u16_le(cliff);
        }
        self.battery.put(dst);
        self.proximity.put(dst);
        for touch in self.touch_level {
            dst.put_u16_le(touch);
        }
        for mic in self.mic_error {
            dst.put_u16_le(mic);
        }
        for sample in self.audio {
            dst.put_i16_le(sample);
        }
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        let framecounter = src.get_u32_le();
        let flags = src.get_u16_le();
        let fail_code = src.get_u16_le();
        let motors = std::array::from_fn(|_| MotorState::get(src));
        let cliff_sense = std::array::from_fn(|_| src.get_u16_le());
        let battery = BatteryState::get(src);
        let proximity = ProxSensor::get(src);
        let touch_level = std::array::from_fn(|_| src.get_u16_le());
        let mic_error = std::array::from_fn(|_| src.get_u16_le());
        let audio = std::array::from_fn(|_| src.get_i16_le());
        Self {
            framecounter,
            flags,
            fail_code,
            motors,
            cliff_sense,
            battery,
            proximity,
            touch_level,
            mic_error,
            audio,
        }
    }
}

/// Hardware and firmware identification reported by the body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub hw_revision: u32,
    pub hw_model: u32,
    /// Electronic identification number.
    pub ein: [u8; VERSION_FIELD_LEN],
    pub app_version: [u8; VERSION_FIELD_LEN],
}

impl VersionInfo {
    /// The application version as text, stopping at the first NUL.
    pub fn app_version_str(&self) -> String {
        let end = self
            .app_version
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VERSION_FIELD_LEN);
        String::from_utf8_lossy(&self.app_version[..end]).into_owned()
    }

    /// The EIN as lowercase hex.
    pub fn ein_hex(&self) -> String {
        self.ein.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Codec for VersionInfo {
    const WIRE_LEN: usize = 4 + 4 + 2 * VERSION_FIELD_LEN;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.hw_revision);
        dst.put_u32_le(self.hw_model);
        dst.put_slice(&self.ein);
        dst.put_slice(&self.app_version);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        Self {
            hw_revision: src.get_u32_le(),
            hw_model: src.get_u32_le(),
            ein: get_array(src),
            app_version: get_array(src),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AckMessage {
    /// Zero or positive on success, negative error code otherwise.
    pub status: i32,
}

impl Codec for AckMessage {
    const WIRE_LEN: usize = 4;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_i32_le(self.status);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        Self {
            status: src.get_i32_le(),
        }
    }
}

/// One block of a firmware image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDfu {
    /// Word offset of this block in application flash.
    pub address: u16,
    /// Number of meaningful words in `data`.
    pub word_count: u16,
    pub data: [u32; DFU_WORDS],
}

impl Default for WriteDfu {
    fn default() -> Self {
        Self {
            address: 0,
            word_count: 0,
            data: [0; DFU_WORDS],
        }
    }
}

impl Codec for WriteDfu {
    const WIRE_LEN: usize = 2 + 2 + 4 * DFU_WORDS;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_u16_le(self.address);
        dst.put_u16_le(self.word_count);
        for word in self.data {
            dst.put_u32_le(word);
        }
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        Self {
            address: src.get_u16_le(),
            word_count: src.get_u16_le(),
            data: std::array::from_fn(|_| src.get_u32_le()),
        }
    }
}

/// Opaque charge-contact command bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactData {
    pub data: [u8; CONTACT_DATA_LEN],
}

impl ContactData {
    /// Pack up to 32 bytes of text, NUL padded.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = [0u8; CONTACT_DATA_LEN];
        let n = bytes.len().min(CONTACT_DATA_LEN);
        data[..n].copy_from_slice(&bytes[..n]);
        Self { data }
    }

    /// The bytes before the first NUL.
    pub fn text(&self) -> &[u8] {
        let end = self
            .data
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(CONTACT_DATA_LEN);
        &self.data[..end]
    }
}

impl Codec for ContactData {
    const WIRE_LEN: usize = CONTACT_DATA_LEN;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_slice(&self.data);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        Self {
            data: get_array(src),
        }
    }
}

/// Minimal status from a body that is stuck in its bootloader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BootFrame {
    pub button_pressed: bool,
}

impl Codec for BootFrame {
    const WIRE_LEN: usize = 4;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_u8(u8::from(self.button_pressed));
        dst.put_bytes(0, 3);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        let button_pressed = src.get_u8() != 0;
        src.advance(3);
        Self { button_pressed }
    }
}

/// LED-only update sent while the body is in calm mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LightState {
    pub led_colors: [u8; LED_BYTES],
}

impl From<&HeadToBody> for LightState {
    fn from(head: &HeadToBody) -> Self {
        Self {
            led_colors: head.led_colors,
        }
    }
}

impl Codec for LightState {
    const WIRE_LEN: usize = LED_BYTES;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_slice(&self.led_colors);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        Self {
            led_colors: get_array(src),
        }
    }
}
