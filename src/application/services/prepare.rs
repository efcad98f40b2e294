//! Remote build-environment preparation — one-off provisioning of a host
//! so later deploy runs start from a known-good toolchain.

use anyhow::Result;

use crate::application::ports::{ProgressReporter, SessionTransport};
use crate::application::services::build::execute_streamed;

/// Provision base build tools, the Go toolchain (with the same install
/// fallback the build driver uses), module proxy configuration, and
/// report on the DCU runtime and disk space. Output streams live.
///
/// # Errors
///
/// Returns an error when the remote procedure exits non-zero.
pub async fn prepare_environment(
    transport: &impl SessionTransport,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    reporter.step("preparing remote build environment");
    let out = execute_streamed(transport, reporter, PREPARE_SCRIPT).await?;
    anyhow::ensure!(
        out.success(),
        "environment preparation failed (exit {}): {}",
        out.exit_code,
        out.diagnostic()
    );
    reporter.success("remote build environment ready");
    Ok(())
}

const PREPARE_SCRIPT: &str = r#"set -e
export PATH=/usr/local/go/bin:$PATH

echo "installing base build tools"
if command -v apt-get >/dev/null 2>&1; then
    apt-get update -qq
    apt-get install -y -qq wget curl git build-essential
else
    yum install -y wget curl git gcc make
fi

echo "checking go toolchain"
INSTALL_GO=true
if command -v go >/dev/null 2>&1; then
    GO_VERSION=$(go version | sed 's/.*go\([0-9]*\.[0-9]*\).*/\1/')
    echo "found go ${GO_VERSION}"
    if [ "$(printf '%s\n' "$GO_VERSION" "1.21" | sort -V | head -n1)" = "1.21" ]; then
        echo "go version satisfies minimum 1.21"
        INSTALL_GO=false
    fi
fi
if [ "$INSTALL_GO" = true ]; then
    echo "installing go 1.21.13"
    cd /tmp
    if wget -q https://go.dev/dl/go1.21.13.linux-amd64.tar.gz; then
        rm -rf /usr/local/go
        tar -C /usr/local -xzf go1.21.13.linux-amd64.tar.gz
    else
        echo "go.dev download failed, falling back to the package manager"
        if command -v apt-get >/dev/null 2>&1; then
            apt-get install -y -qq golang-go
        else
            yum install -y golang
        fi
    fi
fi
go version

if ! grep -q "/usr/local/go/bin" /etc/profile; then
    echo 'export PATH=/usr/local/go/bin:$PATH' >> /etc/profile
fi

echo "configuring module proxy"
go env -w GO111MODULE=on
go env -w GOPROXY="https://goproxy.cn,direct"
go env -w GOSUMDB="sum.golang.google.cn"
if ! curl -I -s --connect-timeout 10 https://goproxy.cn >/dev/null; then
    echo "primary mirror unreachable, switching to the secondary mirror list"
    go env -w GOPROXY="https://goproxy.io,https://proxy.golang.org,direct"
fi
echo "GOPROXY: $(go env GOPROXY)"

echo "smoke-testing module download"
cd "$(mktemp -d)"
go mod init proxycheck >/dev/null 2>&1
if timeout 60 go get github.com/sirupsen/logrus@v1.9.3 >/dev/null 2>&1; then
    echo "module download works"
else
    echo "module download smoke test failed; proxy is configured, fetch may still need attention"
fi

echo "checking DCU runtime"
if [ -f /usr/local/hyhal/bin/hy-smi ]; then
    echo "found hy-smi: /usr/local/hyhal/bin/hy-smi"
    /usr/local/hyhal/bin/hy-smi --version 2>/dev/null || true
else
    echo "hy-smi not found; built exporters will run without DCU access"
fi

echo "disk space:"
df -h / /opt 2>/dev/null || df -h /
echo "environment preparation finished""#;
