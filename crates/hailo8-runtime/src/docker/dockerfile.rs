//! Dockerfile and in-image smoke test for the runtime image.

/// Path of the smoke test script inside the image.
pub const IMAGE_TEST_SCRIPT: &str = "/opt/hailo/test.py";

/// Python scan script baked into the image.
const TEST_SCRIPT: &str = r#"import sys
from hailo_platform import Device

try:
    devices = Device.scan()
except Exception as exc:
    print(f"Device scan failed: {exc}")
    sys.exit(1)

print(f"Found {len(devices)} Hailo device(s)")
for device in devices:
    print(f"  {device}")
"#;

/// Render the Dockerfile for `base_image`.
///
/// The build context must contain a `packages/` directory with the
/// HailoRT `.deb` and Python wheel.
pub fn render_dockerfile(base_image: &str) -> String {
    let script = TEST_SCRIPT
        .lines()
        .map(|line| format!("    echo '{}' >> {IMAGE_TEST_SCRIPT}", line.replace('\'', r"'\''")))
        .collect::<Vec<_>>()
        .join(" && \\\n");

    format!(
        r#"FROM {base_image}

ENV DEBIAN_FRONTEND=noninteractive

RUN apt-get update && apt-get install -y \
    python3 \
    python3-pip \
    python3-dev \
    build-essential \
    libusb-1.0-0 \
    libudev1 \
    && rm -rf /var/lib/apt/lists/*

COPY packages/ /tmp/packages/

RUN if ls /tmp/packages/hailort_*.deb >/dev/null 2>&1; then \
        dpkg -i /tmp/packages/hailort_*.deb || apt-get -f install -y; \
    fi

RUN if ls /tmp/packages/hailort-*.whl >/dev/null 2>&1; then \
        pip3 install /tmp/packages/hailort-*.whl; \
    fi

RUN pip3 install numpy opencv-python pillow

RUN mkdir -p /opt/hailo && \
{script}

WORKDIR /opt/hailo

CMD ["python3", "{IMAGE_TEST_SCRIPT}"]
"#
    )
}
