#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Cursor, Write},
    net::{Shutdown, TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};

use zip::write::{FileOptions, ZipWriter};

#[derive(Debug, Clone)]
pub enum Reply {
    Body(Vec<u8>),
    /// Body sent without a Content-Length header; the connection close ends it.
    Unsized(Vec<u8>),
    /// Declares `declared` bytes but sends only `body`, then hangs up.
    Truncated { body: Vec<u8>, declared: usize },
    NotFound,
}

/// Minimal HTTP/1.1 server on loopback that serves canned replies by path.
pub struct TestServer {
    base: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl TestServer {
    pub fn start(routes: Vec<(&str, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: HashMap<String, Reply> = routes
            .into_iter()
            .map(|(path, reply)| (path.to_string(), reply))
            .collect();
        let hits = Arc::new(Mutex::new(HashMap::new()));
        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                serve(stream, &routes, &counter);
            }
        });
        Self { base, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

fn serve(
    mut stream: TcpStream,
    routes: &HashMap<String, Reply>,
    hits: &Mutex<HashMap<String, usize>>,
) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header == "\r\n" => break,
            Ok(_) => {}
        }
    }
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();
    *hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;

    let reply = routes.get(&path).cloned().unwrap_or(Reply::NotFound);
    let _ = match reply {
        Reply::Body(body) => write_response(&mut stream, "200 OK", Some(body.len()), &body),
        Reply::Unsized(body) => write_response(&mut stream, "200 OK", None, &body),
        Reply::Truncated { body, declared } => {
            write_response(&mut stream, "200 OK", Some(declared), &body)
        }
        Reply::NotFound => write_response(&mut stream, "404 Not Found", Some(0), &[]),
    };
    let _ = stream.flush();
    let _ = stream.shutdown(Shutdown::Both);
}

fn write_response(
    stream: &mut TcpStream,
    status: &str,
    length: Option<usize>,
    body: &[u8],
) -> std::io::Result<()> {
    write!(stream, "HTTP/1.1 {status}\r\nConnection: close\r\n")?;
    if let Some(length) = length {
        write!(stream, "Content-Length: {length}\r\n")?;
    }
    write!(stream, "\r\n")?;
    stream.write_all(body)
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
