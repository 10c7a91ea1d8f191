use anyhow::{Result, anyhow};
use log::{info, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tiny_http::{Header, Response, Server};
use url::Url;

use crate::auth::SessionToken;

/// Result of inspecting a redirect that reached the callback listener.
#[derive(Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    LoggedIn(SessionToken),
    NotLoggedIn,
}

/// `logged_in=true` plus a non-empty `state` means the backend accepted the
/// login; anything else sends the user back to the start.
pub fn parse_callback(url: &Url) -> CallbackOutcome {
    let mut logged_in = false;
    let mut state = None;
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "logged_in" => logged_in = v == "true",
            "state" if !v.is_empty() => state = Some(v.into_owned()),
            _ => {}
        }
    }
    match (logged_in, state) {
        (true, Some(s)) => CallbackOutcome::LoggedIn(SessionToken::new(s)),
        _ => CallbackOutcome::NotLoggedIn,
    }
}

pub fn login_url(backend_url: &str) -> Result<Url> {
    let base = Url::parse(backend_url)
        .map_err(|e| anyhow!("Invalid backend_url '{backend_url}': {e}"))?;
    Ok(base.join("login")?)
}

fn bind_addr(callback: &Url) -> Result<SocketAddr> {
    let host = callback
        .host_str()
        .ok_or_else(|| anyhow!("callback_uri missing host: {callback}"))?;
    let port = callback
        .port_or_known_default()
        .ok_or_else(|| anyhow!("callback_uri missing/unknown port: {callback}"))?;

    let ip: IpAddr = match host {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse::<IpAddr>().map_err(|_| {
            anyhow!("callback_uri host must be localhost/127.0.0.1 or an IP: {other}")
        })?,
    };
    Ok(SocketAddr::new(ip, port))
}

fn html(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let page = format!("<!doctype html><html><body><p>{body}</p></body></html>");
    let mut resp = Response::from_string(page);
    if let Ok(h) = Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
        resp.add_header(h);
    }
    resp
}

/// Run the backend's browser login and capture the session token from the
/// redirect it sends back to `callback_uri`.
pub fn perform_login(
    backend_url: &str,
    callback_uri: &str,
    timeout: Duration,
) -> Result<SessionToken> {
    let callback = Url::parse(callback_uri)
        .map_err(|e| anyhow!("Invalid callback_uri '{callback_uri}': {e}"))?;
    let addr = bind_addr(&callback)?;

    // listen before the browser can possibly come back
    let server = Server::http(addr)
        .map_err(|e| anyhow!("Failed to bind login callback server on {addr}: {e:?}"))?;

    let url = login_url(backend_url)?;
    println!("Open this URL in your browser to connect your mailbox:\n{url}");
    if let Err(e) = open::that(url.as_str()) {
        warn!("could not open browser automatically: {e}");
    }

    wait_for_login(&server, addr, timeout)
}

fn wait_for_login(server: &Server, addr: SocketAddr, timeout: Duration) -> Result<SessionToken> {
    let wait_until = Instant::now() + timeout;
    while Instant::now() < wait_until {
        let Ok(maybe_request) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };
        let Some(request) = maybe_request else {
            continue;
        };

        let full = format!("http://{}{}", addr, request.url());
        let outcome = match Url::parse(&full) {
            Ok(parsed) => parse_callback(&parsed),
            Err(_) => {
                let _ = request.respond(html("Bad redirect."));
                continue;
            }
        };

        match outcome {
            CallbackOutcome::LoggedIn(token) => {
                let _ = request.respond(html(
                    "You are signed in. You can close this tab and return to the terminal.",
                ));
                info!("login completed");
                return Ok(token);
            }
            CallbackOutcome::NotLoggedIn => {
                let _ = request.respond(html(
                    "No login found in this redirect. Finish signing in from the other tab.",
                ));
            }
        }
    }

    Err(anyhow!(
        "No login received within {} seconds",
        timeout.as_secs()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_with_login_params_yields_token() {
        let url = Url::parse("http://localhost:3000/?logged_in=true&state=abc%20123").unwrap();
        assert_eq!(
            parse_callback(&url),
            CallbackOutcome::LoggedIn(SessionToken::new("abc 123"))
        );
    }

    #[test]
    fn callback_without_flag_or_state_is_rejected() {
        for raw in [
            "http://localhost:3000/",
            "http://localhost:3000/?state=abc",
            "http://localhost:3000/?logged_in=false&state=abc",
            "http://localhost:3000/?logged_in=true&state=",
            "http://localhost:3000/favicon.ico",
        ] {
            let url = Url::parse(raw).unwrap();
            assert_eq!(parse_callback(&url), CallbackOutcome::NotLoggedIn, "{raw}");
        }
    }

    #[test]
    fn login_url_joins_backend() {
        assert_eq!(
            login_url("http://localhost:5000").unwrap().as_str(),
            "http://localhost:5000/login"
        );
        assert_eq!(
            login_url("https://digest.example.com/").unwrap().as_str(),
            "https://digest.example.com/login"
        );
    }

    #[test]
    fn bind_addr_only_accepts_loopback_or_ip() {
        let ok = Url::parse("http://localhost:3000/callback").unwrap();
        assert_eq!(bind_addr(&ok).unwrap(), "127.0.0.1:3000".parse::<SocketAddr>().unwrap());

        let ip = Url::parse("http://0.0.0.0:4000/").unwrap();
        assert_eq!(bind_addr(&ip).unwrap().port(), 4000);

        let named = Url::parse("http://example.com/callback").unwrap();
        assert!(bind_addr(&named).is_err());
    }

    #[test]
    fn listener_captures_redirect() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        let server = Server::http(addr).unwrap();

        let handle =
            std::thread::spawn(move || wait_for_login(&server, addr, Duration::from_secs(10)));

        let client = reqwest::blocking::Client::new();
        let stray = format!("http://127.0.0.1:{port}/favicon.ico");
        let url = format!("http://127.0.0.1:{port}/?logged_in=true&state=sess-1");
        let mut sent = false;
        for _ in 0..50 {
            if client.get(&stray).send().is_ok() && client.get(&url).send().is_ok() {
                sent = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        assert!(sent, "callback listener never came up");

        let token = handle.join().unwrap().unwrap();
        assert_eq!(token.as_str(), "sess-1");
    }
}
