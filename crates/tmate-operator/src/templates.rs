// ABOUTME: Renders the files the operator writes: key script, systemd unit, proxy config, client config.
// ABOUTME: Pure functions over embedded text; no I/O.

use crate::state::ProxyConfig;
use serde::Serialize;
use std::path::Path;

/// Parameters for the key creation script.
#[derive(Debug, Clone)]
pub struct KeyScriptParams<'a> {
    pub keys_dir: &'a Path,
    pub host: &'a str,
    pub port: u16,
}

/// Key creation script. Generates each host key only if it is absent, so
/// re-running keeps existing fingerprints stable.
pub fn render_key_script(params: &KeyScriptParams<'_>) -> String {
    format!(
        r#"#!/bin/bash
set -eu

KEYS_DIR="{keys_dir}"
mkdir -p "$KEYS_DIR"

gen_key() {{
    keytype=$1
    key="$KEYS_DIR/ssh_host_${{keytype}}_key"
    if [ ! -e "$key" ]; then
        ssh-keygen -t "$keytype" -f "$key" -N '' -q
    fi
    ssh-keygen -l -E SHA256 -f "$key.pub" | cut -d ' ' -f 2
}}

RSA_SIG=$(gen_key rsa)
ED25519_SIG=$(gen_key ed25519)

echo "set -g tmate-server-host {host}"
echo "set -g tmate-server-port {port}"
echo "set -g tmate-server-rsa-fingerprint $RSA_SIG"
echo "set -g tmate-server-ed25519-fingerprint $ED25519_SIG"
"#,
        keys_dir = params.keys_dir.display(),
        host = params.host,
        port = params.port,
    )
}

/// Parameters for the daemon's systemd unit.
#[derive(Debug, Clone)]
pub struct UnitParams<'a> {
    pub service_name: &'a str,
    pub image: &'a str,
    pub work_dir: &'a Path,
    pub keys_dir: &'a Path,
    pub port: u16,
    pub address: &'a str,
}

/// systemd unit running tmate-ssh-server in a container.
pub fn render_unit(params: &UnitParams<'_>) -> String {
    format!(
        r#"[Unit]
Description=tmate-ssh-server
After=docker.service
Requires=docker.service

[Service]
WorkingDirectory={work_dir}
ExecStartPre=-/usr/bin/docker rm -f {name}
ExecStart=/usr/bin/docker run --rm --name {name} \
    --cap-add SYS_ADMIN \
    -v {keys_dir}:/keys \
    -e SSH_KEYS_PATH=/keys \
    -p {port}:{port} \
    -e SSH_PORT_LISTEN={port} \
    -e SSH_HOSTNAME={address} \
    -e USE_PROXY_PROTOCOL=0 \
    {image}
ExecStop=/usr/bin/docker stop {name}
Restart=always
RestartSec=5

[Install]
WantedBy=multi-user.target
"#,
        name = params.service_name,
        work_dir = params.work_dir.display(),
        keys_dir = params.keys_dir.display(),
        port = params.port,
        address = params.address,
        image = params.image,
    )
}

#[derive(Serialize)]
struct DockerDaemonConfig<'a> {
    proxies: &'a ProxyConfig,
}

/// Container runtime daemon config carrying proxy settings.
pub fn render_docker_proxy_config(proxy: &ProxyConfig) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&DockerDaemonConfig { proxies: proxy })
}

/// Parameters for the client configuration block.
#[derive(Debug, Clone)]
pub struct ClientConfigParams<'a> {
    pub host: &'a str,
    pub port: u16,
    pub rsa_fingerprint: &'a str,
    pub ed25519_fingerprint: &'a str,
}

/// `.tmate.conf` block handed to clients. Line order and the surrounding
/// blank lines are part of the client contract.
pub fn render_client_config(params: &ClientConfigParams<'_>) -> String {
    format!(
        "\nset -g tmate-server-host {host}\n\
         set -g tmate-server-port {port}\n\
         set -g tmate-server-rsa-fingerprint {rsa}\n\
         set -g tmate-server-ed25519-fingerprint {ed25519}\n",
        host = params.host,
        port = params.port,
        rsa = params.rsa_fingerprint,
        ed25519 = params.ed25519_fingerprint,
    )
}
