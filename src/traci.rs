//! A blocking client for the TraCI remote control protocol.

mod protocol;

use crate::error::{Error, Result};
use crate::session::Simulator;
use log::{debug, info};
use protocol::{MessageBuilder, MessageReader, Status};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

/// How long to wait between connection attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Give up on a reply that takes longer than this.
const REPLY_TIMEOUT: Duration = Duration::from_secs(120);

/// A synchronous TraCI session over TCP.
///
/// Every operation is one request/response round trip. Per-object
/// queries treat an error status from the simulator as "no value",
/// since that is how SUMO answers for objects it no longer knows.
pub struct TraciClient {
    stream: TcpStream,
}

impl TraciClient {
    /// Connects to a simulator, retrying until it accepts or the timeout
    /// elapses. SUMO opens its listener some time after launch, so
    /// refused attempts are expected at first.
    pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        let stream = loop {
            match TcpStream::connect_timeout(&addr, RETRY_INTERVAL) {
                Ok(stream) => break stream,
                Err(err) => {
                    if Instant::now() + RETRY_INTERVAL >= deadline {
                        return Err(Error::ConnectTimeout {
                            addr: addr.to_string(),
                            timeout,
                        });
                    }
                    debug!("connect to {addr} failed ({err}), retrying");
                    std::thread::sleep(RETRY_INTERVAL);
                }
            }
        };
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(REPLY_TIMEOUT))?;
        stream.set_write_timeout(Some(REPLY_TIMEOUT))?;

        let mut client = Self { stream };
        let (api, version) = client.version_handshake()?;
        info!("connected to {version} speaking TraCI API {api}");
        Ok(client)
    }

    /// Sends one command and returns the body of the reply message.
    fn request(&mut self, command: u8, payload: &[u8]) -> Result<Vec<u8>> {
        let message = MessageBuilder::new().command(command, payload).finish();
        self.stream.write_all(&message)?;
        self.read_message()
    }

    /// Reads one complete message, without its length prefix.
    fn read_message(&mut self) -> Result<Vec<u8>> {
        let mut len = [0; 4];
        self.stream.read_exact(&mut len)?;
        let len = i32::from_be_bytes(len);
        if len < 4 {
            return Err(Error::Protocol(format!("message length {len} is too short")));
        }
        let mut buf = vec![0; len as usize - 4];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn version_handshake(&mut self) -> Result<(i32, String)> {
        let body = self.request(protocol::CMD_GET_VERSION, &[])?;
        let mut reader = MessageReader::new(body);
        expect_ok(protocol::read_status(&mut reader)?)?;
        let (_, id) = protocol::read_command_header(&mut reader)?;
        if id != protocol::CMD_GET_VERSION {
            return Err(Error::Protocol(format!(
                "unexpected response {id:#04x} to the version handshake"
            )));
        }
        let api = reader.read_i32()?;
        let version = reader.read_string()?;
        Ok((api, version))
    }

    /// Retrieves a variable, failing if the simulator refuses.
    ///
    /// Returns the reader positioned on the value type marker.
    fn query(&mut self, command: u8, variable: u8, object: &str) -> Result<MessageReader> {
        let body = self.request(command, &protocol::variable_payload(variable, object))?;
        let mut reader = MessageReader::new(body);
        expect_ok(protocol::read_status(&mut reader)?)?;
        let (_, id) = protocol::read_command_header(&mut reader)?;
        if id != protocol::response_id(command) {
            return Err(Error::Protocol(format!(
                "unexpected response {id:#04x} to command {command:#04x}"
            )));
        }
        let echoed = reader.read_u8()?;
        if echoed != variable {
            return Err(Error::Protocol(format!(
                "response carries variable {echoed:#04x}, asked for {variable:#04x}"
            )));
        }
        reader.read_string()?;
        Ok(reader)
    }

    /// Retrieves a variable, turning a refusal into `Ok(None)`.
    fn query_value<T>(
        &mut self,
        command: u8,
        variable: u8,
        object: &str,
        read: impl FnOnce(&mut MessageReader) -> Result<T>,
    ) -> Result<Option<T>> {
        match self.query(command, variable, object) {
            Ok(mut reader) => Ok(Some(read(&mut reader)?)),
            Err(Error::Command { description, .. }) => {
                debug!("query {variable:#04x} on {object:?} refused: {description}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

impl Simulator for TraciClient {
    fn time(&mut self) -> Result<f64> {
        let mut reader = self.query(protocol::CMD_GET_SIM_VARIABLE, protocol::VAR_TIME, "")?;
        reader.expect_type(protocol::TYPE_DOUBLE)?;
        reader.read_f64()
    }

    fn step(&mut self) -> Result<()> {
        // A zero target time advances the simulation by a single step.
        let body = self.request(protocol::CMD_SIM_STEP, &0f64.to_be_bytes())?;
        let mut reader = MessageReader::new(body);
        expect_ok(protocol::read_status(&mut reader)?)?;
        // The rest of the message is the subscription result block,
        // which is empty because nothing is subscribed.
        Ok(())
    }

    fn vehicle_ids(&mut self) -> Result<Vec<String>> {
        let mut reader = self.query(
            protocol::CMD_GET_VEHICLE_VARIABLE,
            protocol::VAR_ID_LIST,
            "",
        )?;
        reader.expect_type(protocol::TYPE_STRING_LIST)?;
        reader.read_string_list()
    }

    fn vehicle_lane(&mut self, vehicle: &str) -> Result<Option<String>> {
        self.query_value(
            protocol::CMD_GET_VEHICLE_VARIABLE,
            protocol::VAR_LANE_ID,
            vehicle,
            |reader| {
                reader.expect_type(protocol::TYPE_STRING)?;
                reader.read_string()
            },
        )
    }

    fn vehicle_lane_position(&mut self, vehicle: &str) -> Result<Option<f64>> {
        self.query_value(
            protocol::CMD_GET_VEHICLE_VARIABLE,
            protocol::VAR_LANE_POSITION,
            vehicle,
            |reader| {
                reader.expect_type(protocol::TYPE_DOUBLE)?;
                reader.read_f64()
            },
        )
    }

    fn vehicle_route(&mut self, vehicle: &str) -> Result<Option<Vec<String>>> {
        self.query_value(
            protocol::CMD_GET_VEHICLE_VARIABLE,
            protocol::VAR_EDGES,
            vehicle,
            |reader| {
                reader.expect_type(protocol::TYPE_STRING_LIST)?;
                reader.read_string_list()
            },
        )
    }

    fn vehicle_route_index(&mut self, vehicle: &str) -> Result<Option<i32>> {
        self.query_value(
            protocol::CMD_GET_VEHICLE_VARIABLE,
            protocol::VAR_ROUTE_INDEX,
            vehicle,
            |reader| {
                reader.expect_type(protocol::TYPE_INTEGER)?;
                reader.read_i32()
            },
        )
    }

    fn controlled_lanes(&mut self, light: &str) -> Result<Option<Vec<String>>> {
        self.query_value(
            protocol::CMD_GET_TL_VARIABLE,
            protocol::TL_CONTROLLED_LANES,
            light,
            |reader| {
                reader.expect_type(protocol::TYPE_STRING_LIST)?;
                reader.read_string_list()
            },
        )
    }

    fn close(&mut self) -> Result<()> {
        let body = self.request(protocol::CMD_CLOSE, &[])?;
        let mut reader = MessageReader::new(body);
        expect_ok(protocol::read_status(&mut reader)?)
    }
}

fn expect_ok(status: Status) -> Result<()> {
    match status.result {
        protocol::RTYPE_OK => Ok(()),
        protocol::RTYPE_ERR => Err(Error::Command {
            command: status.command,
            description: status.description,
        }),
        other => Err(Error::Protocol(format!(
            "unknown status result {other:#04x}"
        ))),
    }
}
