use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;

/// Host value meaning "every interface".
pub const WILDCARD_HOST: &str = "*";

/// Binds the relay's listening socket and returns it with its bound address.
pub async fn create_listener(host: &str, port: u16) -> std::io::Result<(SocketAddr, TcpListener)> {
    if host == WILDCARD_HOST {
        return bind_wildcard(port);
    }

    tracing::info!("Binding relay to {}:{}...", host, port);
    let listener = TcpListener::bind((host, port)).await?;
    Ok((listener.local_addr()?, listener))
}

// Prefers one dual-stack IPv6 socket, which also accepts IPv4 where the OS allows it
fn bind_wildcard(port: u16) -> std::io::Result<(SocketAddr, TcpListener)> {
    let ipv6_addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    match bind_socket(Domain::IPV6, ipv6_addr, true) {
        Ok(listener) => return Ok((listener.local_addr()?, listener)),
        Err(e) => tracing::warn!("Failed to bind IPv6 wildcard listener: {}. Falling back to IPv4.", e),
    }

    let ipv4_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = bind_socket(Domain::IPV4, ipv4_addr, false)?;
    Ok((listener.local_addr()?, listener))
}

fn bind_socket(domain: Domain, addr: SocketAddr, dual_stack: bool) -> std::io::Result<TcpListener> {
    tracing::info!("Binding relay to {}...", addr);

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    if dual_stack {
        // Some systems refuse dual-stack; the socket still serves IPv6
        if let Err(e) = socket.set_only_v6(false) {
            tracing::warn!("Failed to enable dual-stack mode: {}. Continuing with IPv6 only.", e);
        }
    }

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    // Tokio requires non-blocking sockets
    socket.set_nonblocking(true)?;

    TcpListener::from_std(socket.into())
}
