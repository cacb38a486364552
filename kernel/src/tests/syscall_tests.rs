//! System Call Unit Tests
//!
//! Tests for dispatching decoded calls and the values user space sees.

#[cfg(test)]
mod tests {
    use crate::config::{
        process_frame, vidmap_address, USER_WINDOW_BASE, VIDEO_BACKING, VIDEO_MEMORY,
    };
    use crate::drivers::KeyInput;
    use crate::process::{ContextSlot, ProcessId};
    use crate::syscall::{Syscall, SyscallOutcome};
    use crate::tests::support::{
        boot, boot_single_shell, boot_with_shells, program, standard_image, FsImageBuilder,
        CAT_ENTRY, FRAME0,
    };

    const OUT: u32 = 0x0804_9000;

    // ========================================
    // File Call Tests
    // ========================================

    #[test]
    fn test_open_read_close() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        assert_eq!(kernel.dispatch(Syscall::Open(b"frame0.txt")), SyscallOutcome::Return(2));

        let mut buf = [0u8; 256];
        assert_eq!(
            kernel.dispatch(Syscall::Read { fd: 2, buf: &mut buf }),
            SyscallOutcome::Return(FRAME0.len() as i32)
        );
        assert_eq!(&buf[..FRAME0.len()], FRAME0);
        assert_eq!(
            kernel.dispatch(Syscall::Read { fd: 2, buf: &mut buf }),
            SyscallOutcome::Return(0)
        );

        assert_eq!(kernel.dispatch(Syscall::Close(2)), SyscallOutcome::Return(0));
        assert_eq!(kernel.dispatch(Syscall::Close(2)), SyscallOutcome::Return(-1));
    }

    #[test]
    fn test_errors_return_minus_one() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);
        let mut buf = [0u8; 8];

        assert_eq!(kernel.dispatch(Syscall::Open(b"missing")), SyscallOutcome::Return(-1));
        assert_eq!(kernel.dispatch(Syscall::Close(0)), SyscallOutcome::Return(-1));
        assert_eq!(kernel.dispatch(Syscall::Close(1)), SyscallOutcome::Return(-1));
        assert_eq!(
            kernel.dispatch(Syscall::Read { fd: 1, buf: &mut buf }),
            SyscallOutcome::Return(-1)
        );
        assert_eq!(
            kernel.dispatch(Syscall::Write { fd: 0, buf: b"x" }),
            SyscallOutcome::Return(-1)
        );
        assert_eq!(
            kernel.dispatch(Syscall::Read { fd: 7, buf: &mut buf }),
            SyscallOutcome::Return(-1)
        );
        assert_eq!(
            kernel.dispatch(Syscall::Read { fd: usize::MAX, buf: &mut buf }),
            SyscallOutcome::Return(-1)
        );
    }

    #[test]
    fn test_write_stdout() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        assert_eq!(
            kernel.dispatch(Syscall::Write { fd: 1, buf: b"hello\n" }),
            SyscallOutcome::Return(6)
        );
        assert_eq!(kernel.platform().screen(VIDEO_MEMORY), b"hello\n");
    }

    #[test]
    fn test_read_stdin_pends_until_enter() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);
        let mut buf = [0u8; 16];

        assert_eq!(
            kernel.dispatch(Syscall::Read { fd: 0, buf: &mut buf }),
            SyscallOutcome::Pending
        );
        for &b in b"ls" {
            kernel.handle_key(KeyInput::Char(b));
        }
        kernel.handle_key(KeyInput::Enter);

        assert_eq!(
            kernel.dispatch(Syscall::Read { fd: 0, buf: &mut buf }),
            SyscallOutcome::Return(3)
        );
        assert_eq!(&buf[..3], b"ls\n");
    }

    #[test]
    fn test_no_running_process() {
        let image = standard_image();
        let mut kernel = boot(&image);
        assert_eq!(kernel.dispatch(Syscall::Open(b"frame0.txt")), SyscallOutcome::Return(-1));
        assert_eq!(kernel.dispatch(Syscall::Halt(0)), SyscallOutcome::Return(-1));
    }

    // ========================================
    // Process Call Tests
    // ========================================

    #[test]
    fn test_execute_enters_child() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        match kernel.dispatch(Syscall::Execute(b"cat frame0.txt")) {
            SyscallOutcome::Enter { entry, save } => {
                assert_eq!(entry.pid, ProcessId(1));
                assert_eq!(save, ContextSlot::Parent(ProcessId(1)));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(
            kernel.dispatch(Syscall::Execute(b"missing")),
            SyscallOutcome::Return(-1)
        );
    }

    #[test]
    fn test_halt_resumes_parent() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        kernel.dispatch(Syscall::Execute(b"cat"));
        match kernel.dispatch(Syscall::Halt(42)) {
            SyscallOutcome::Resume { status, .. } => assert_eq!(status, 42),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(kernel.current_process(), Some(ProcessId(0)));
    }

    #[test]
    fn test_root_halt_discards_context() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        match kernel.dispatch(Syscall::Halt(0)) {
            SyscallOutcome::Enter { entry, save } => {
                assert_eq!(entry.pid, ProcessId(0));
                assert_eq!(save, ContextSlot::Discard);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_root_halt_without_shell_abandons_caller() {
        let image = FsImageBuilder::new()
            .directory(".")
            .file("cat", &program(CAT_ENTRY, b"cat code"))
            .build();
        let mut kernel = boot(&image);
        kernel.spawn(b"cat", true).unwrap();

        assert_eq!(kernel.dispatch(Syscall::Halt(0)), SyscallOutcome::Abandon);
        assert_eq!(kernel.current_process(), None);
        assert_eq!(kernel.processes().live_count(), 0);
    }

    #[test]
    fn test_get_args_call() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        kernel.dispatch(Syscall::Execute(b"cat frame0.txt"));
        let mut buf = [0u8; 20];
        assert_eq!(kernel.dispatch(Syscall::GetArgs(&mut buf)), SyscallOutcome::Return(0));
        assert_eq!(&buf[..11], b"frame0.txt\0");
    }

    #[test]
    fn test_signals_unsupported() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        assert_eq!(
            kernel.dispatch(Syscall::SetHandler { signal: 2, handler: 0x0804_8000 }),
            SyscallOutcome::Return(-1)
        );
        assert_eq!(kernel.dispatch(Syscall::SigReturn), SyscallOutcome::Return(-1));
    }

    // ========================================
    // Vidmap Tests
    // ========================================

    #[test]
    fn test_vidmap_rejects_bad_pointers() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        assert_eq!(kernel.dispatch(Syscall::Vidmap(0)), SyscallOutcome::Return(-1));
        assert_eq!(kernel.dispatch(Syscall::Vidmap(0x0040_0000)), SyscallOutcome::Return(-1));
        assert_eq!(
            kernel.dispatch(Syscall::Vidmap(USER_WINDOW_BASE - 4)),
            SyscallOutcome::Return(-1)
        );
        assert_eq!(kernel.terminal(0).video_users, 0);
    }

    #[test]
    fn test_vidmap_on_screen_terminal() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        assert_eq!(
            kernel.dispatch(Syscall::Vidmap(OUT)),
            SyscallOutcome::Return(vidmap_address(0) as i32)
        );

        let physical = process_frame(0) + (OUT - USER_WINDOW_BASE);
        assert_eq!(
            kernel.platform().read_physical(physical, 4),
            vidmap_address(0).to_le_bytes()
        );
        assert_eq!(kernel.address_space().translate(vidmap_address(0)), Some(VIDEO_MEMORY));
        assert!(kernel.address_space().is_user_accessible(vidmap_address(0)));
        assert_eq!(kernel.terminal(0).video_users, 1);
    }

    #[test]
    fn test_vidmap_returns_window_address() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        assert_eq!(
            kernel.dispatch(Syscall::Vidmap(USER_WINDOW_BASE + 0x10_0000)),
            SyscallOutcome::Return(0x0840_0000)
        );
    }

    #[test]
    fn test_vidmap_on_background_terminal() {
        let image = standard_image();
        let mut kernel = boot_with_shells(&image);
        assert_eq!(kernel.current_terminal(), 2);
        assert_eq!(kernel.screen_terminal(), 0);

        assert_eq!(kernel.map_video_memory(OUT), Ok(vidmap_address(2)));
        assert_eq!(
            kernel.address_space().translate(vidmap_address(2)),
            Some(VIDEO_BACKING[2])
        );

        kernel.switch_screen(2);
        assert_eq!(kernel.address_space().translate(vidmap_address(2)), Some(VIDEO_MEMORY));
    }

    #[test]
    fn test_halt_drops_video_user() {
        let image = standard_image();
        let mut kernel = boot_single_shell(&image);

        kernel.dispatch(Syscall::Execute(b"cat"));
        kernel.dispatch(Syscall::Vidmap(OUT));
        assert_eq!(kernel.terminal(0).video_users, 1);

        kernel.dispatch(Syscall::Halt(0));
        assert_eq!(kernel.terminal(0).video_users, 0);
    }
}
