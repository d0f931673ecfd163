//! Blocking client
//!
//! One `Client` is one connection, and therefore one server-side session:
//! locks taken through it are released when it is dropped.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::protocol::{read_response, write_command, write_frame, Command, Response};
use crate::store::LockMode;

/// Client for a LockKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and wait for its response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Send an arbitrary payload (it need not be valid JSON)
    pub fn send_raw(&mut self, payload: &[u8]) -> Result<Response> {
        write_frame(&mut self.writer, payload)?;
        read_response(&mut self.reader)
    }

    pub fn write(&mut self, keys: &[&str], values: &[&str]) -> Result<Response> {
        self.send(&Command::write(owned(keys), owned(values)))
    }

    /// Write with the optional flags
    pub fn write_with(
        &mut self,
        keys: &[&str],
        values: &[&str],
        hold_lock: bool,
        report_skipped: bool,
    ) -> Result<Response> {
        self.send(&Command::Write {
            keys: owned(keys),
            values: owned(values),
            hold_lock,
            report_skipped,
        })
    }

    pub fn read(&mut self, keys: &[&str]) -> Result<Response> {
        self.send(&Command::Read { keys: owned(keys) })
    }

    pub fn lock(&mut self, keys: &[&str], mode: LockMode) -> Result<Response> {
        self.send(&Command::Lock {
            keys: owned(keys),
            mode,
        })
    }

    pub fn unlock(&mut self, keys: &[&str]) -> Result<Response> {
        self.send(&Command::Unlock { keys: owned(keys) })
    }

    /// Local address of this connection (the server's session id for it)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.writer.get_ref().local_addr()?)
    }

    /// Close the connection, ending the server-side session
    pub fn close(self) -> Result<()> {
        self.writer.get_ref().shutdown(Shutdown::Both)?;
        Ok(())
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
